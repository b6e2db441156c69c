use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const USERS_TABLE_V_0: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("username", SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("password", SqlType::Text, non_null = true),
        sqlite_column!("fullname", SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Refresh tokens currently accepted by `PUT /authentications`.
const AUTHENTICATIONS_TABLE_V_0: Table = Table {
    name: "authentications",
    columns: &[sqlite_column!(
        "token",
        SqlType::Text,
        is_primary_key = true,
        non_null = true
    )],
    indices: &[],
    unique_constraints: &[],
};

const ALBUMS_TABLE_V_0: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("cover", SqlType::Text),
        sqlite_column!(
            "total_likes",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const SONGS_TABLE_V_0: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("genre", SqlType::Text, non_null = true),
        sqlite_column!("performer", SqlType::Text, non_null = true),
        sqlite_column!("duration", SqlType::Integer),
        sqlite_column!(
            "album_id",
            SqlType::Text,
            foreign_key = Some(&ForeignKey {
                foreign_table: "albums",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
    ],
    indices: &[("idx_songs_album_id", "album_id")],
    unique_constraints: &[],
};

const PLAYLISTS_TABLE_V_0: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!(
            "owner",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "is_delete",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_playlists_owner", "owner")],
    unique_constraints: &[],
};

// No uniqueness on (playlist_id, song_id): adding the same song twice yields two edges.
const PLAYLIST_SONGS_TABLE_V_0: Table = Table {
    name: "playlist_songs",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "playlist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!(
            "song_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "songs",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
    ],
    indices: &[("idx_playlist_songs_playlist_id", "playlist_id")],
    unique_constraints: &[],
};

const COLLABORATIONS_TABLE_V_0: Table = Table {
    name: "collaborations",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "playlist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
    ],
    indices: &[("idx_collaborations_user_id", "user_id")],
    unique_constraints: &[&["playlist_id", "user_id"]],
};

// song_id is deliberately not a foreign key: deleting a song must not erase history.
const PLAYLIST_SONG_ACTIVITIES_TABLE_V_0: Table = Table {
    name: "playlist_song_activities",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "playlist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sqlite_column!("song_id", SqlType::Text, non_null = true),
        sqlite_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("action", SqlType::Text, non_null = true),
        sqlite_column!("time", SqlType::Text, non_null = true),
    ],
    indices: &[("idx_playlist_song_activities_playlist_id", "playlist_id")],
    unique_constraints: &[],
};

const USER_ALBUM_LIKES_TABLE_V_0: Table = Table {
    name: "user_album_likes",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "album_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
    ],
    indices: &[("idx_user_album_likes_album_id", "album_id")],
    unique_constraints: &[&["user_id", "album_id"]],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE_V_0,
        AUTHENTICATIONS_TABLE_V_0,
        ALBUMS_TABLE_V_0,
        SONGS_TABLE_V_0,
        PLAYLISTS_TABLE_V_0,
        PLAYLIST_SONGS_TABLE_V_0,
        COLLABORATIONS_TABLE_V_0,
        PLAYLIST_SONG_ACTIVITIES_TABLE_V_0,
        USER_ALBUM_LIKES_TABLE_V_0,
    ],
    migration: None,
}];

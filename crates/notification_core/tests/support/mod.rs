#![allow(dead_code)]

use rusqlite::{params, Connection};

pub fn insert_account(conn: &Connection, id: i64, username: &str) {
    conn.execute(
        "INSERT INTO accounts (id, username, display_name, updated_at) VALUES (?1, ?2, ?3, 1000);",
        params![id, username, username.to_uppercase()],
    )
    .unwrap();
}

pub fn rename_account(conn: &Connection, id: i64, display_name: &str) {
    conn.execute(
        "UPDATE accounts SET display_name = ?2, updated_at = updated_at + 1 WHERE id = ?1;",
        params![id, display_name],
    )
    .unwrap();
}

pub fn insert_status(conn: &Connection, id: i64, account_id: i64, text: &str) {
    conn.execute(
        "INSERT INTO statuses (id, account_id, text) VALUES (?1, ?2, ?3);",
        params![id, account_id, text],
    )
    .unwrap();
}

pub fn insert_reblog(conn: &Connection, id: i64, account_id: i64, reblog_of_id: i64) {
    conn.execute(
        "INSERT INTO statuses (id, account_id, reblog_of_id) VALUES (?1, ?2, ?3);",
        params![id, account_id, reblog_of_id],
    )
    .unwrap();
}

pub fn insert_media(conn: &Connection, id: i64, status_id: i64, url: &str) {
    conn.execute(
        "INSERT INTO media_attachments (id, status_id, url) VALUES (?1, ?2, ?3);",
        params![id, status_id, url],
    )
    .unwrap();
}

pub fn tag_status(conn: &Connection, status_id: i64, tag_id: i64, name: &str) {
    conn.execute(
        "INSERT OR IGNORE INTO tags (id, name) VALUES (?1, ?2);",
        params![tag_id, name],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO statuses_tags (status_id, tag_id) VALUES (?1, ?2);",
        params![status_id, tag_id],
    )
    .unwrap();
}

pub fn insert_mention(conn: &Connection, id: i64, status_id: i64, account_id: i64) {
    conn.execute(
        "INSERT INTO mentions (id, status_id, account_id) VALUES (?1, ?2, ?3);",
        params![id, status_id, account_id],
    )
    .unwrap();
}

pub fn insert_follow(conn: &Connection, id: i64, account_id: i64, target_account_id: i64) {
    conn.execute(
        "INSERT INTO follows (id, account_id, target_account_id) VALUES (?1, ?2, ?3);",
        params![id, account_id, target_account_id],
    )
    .unwrap();
}

pub fn insert_follow_request(conn: &Connection, id: i64, account_id: i64, target_account_id: i64) {
    conn.execute(
        "INSERT INTO follow_requests (id, account_id, target_account_id) VALUES (?1, ?2, ?3);",
        params![id, account_id, target_account_id],
    )
    .unwrap();
}

pub fn insert_favourite(conn: &Connection, id: i64, account_id: i64, status_id: i64) {
    conn.execute(
        "INSERT INTO favourites (id, account_id, status_id) VALUES (?1, ?2, ?3);",
        params![id, account_id, status_id],
    )
    .unwrap();
}

pub fn notification_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM notifications;", [], |row| row.get(0))
        .unwrap()
}

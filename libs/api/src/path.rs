use crate::request::{PageQuery, PushQuery, RecordFilesQuery};

pub const METRICS: &str = "/metrics";
pub const STATS: &str = "/stats";

pub const PUSHERS: &str = "/Pushers";
pub const PLAYERS: &str = "/Players";

pub const STREAM_START: &str = "/stream/StreamStart";
pub const STREAM_STOP: &str = "/stream/StreamStop";
pub const STREAM_PLAY: &str = "/stream/Play";
pub const STREAM_PLAY_STOP: &str = "/stream/PlayStop";
pub const STREAM_PUSH: &str = "/stream/Push";

pub const RECORD_START: &str = "/record/StartRecord";
pub const RECORD_STOP: &str = "/record/StopRecord";
pub const RECORD_TASKS: &str = "/record/RecordTasks";
pub const RECORD_FOLDERS: &str = "/record/RecordFolders";
pub const RECORD_FILES: &str = "/record/RecordFiles";

pub const SYS_LOGIN: &str = "/sys/Login";
pub const SYS_LOGOUT: &str = "/sys/Logout";
pub const SYS_USER_INFO: &str = "/sys/GetUserInfo";
pub const SYS_MODIFY_PASSWORD: &str = "/sys/ModifyPassword";
pub const SYS_SERVER_INFO: &str = "/sys/GetServerInfo";

pub fn pushers(qry: &PageQuery) -> String {
    with_query(PUSHERS, qry)
}

pub fn players(qry: &PageQuery) -> String {
    with_query(PLAYERS, qry)
}

pub fn push(stream: &str) -> String {
    with_query(
        STREAM_PUSH,
        &PushQuery {
            id: stream.to_string(),
        },
    )
}

pub fn record_files(folder: &str) -> String {
    with_query(
        RECORD_FILES,
        &RecordFilesQuery {
            folder: folder.to_string(),
        },
    )
}

fn with_query<T: serde::Serialize>(path: &str, qry: &T) -> String {
    match serde_html_form::to_string(qry) {
        Ok(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_path() {
        assert_eq!(push("cam1"), "/stream/Push?id=cam1");
        assert_eq!(record_files("/rec"), "/record/RecordFiles?folder=%2Frec");
        assert_eq!(pushers(&PageQuery::default()), "/Pushers");
        assert_eq!(
            players(&PageQuery {
                limit: Some(10),
                sort: Some("id".to_string()),
                ..Default::default()
            }),
            "/Players?limit=10&sort=id"
        );
    }
}

use std::time::Duration;

use http::StatusCode;

mod common;

use common::{serve, serve_with, Server};

async fn error_code(res: reqwest::Response) -> String {
    res.json::<api::response::Error>().await.unwrap().code
}

async fn pushers(
    server: &Server,
    query: &api::request::PageQuery,
) -> api::response::Page<api::response::Pusher> {
    let res = server.get(&api::path::pushers(query)).await;
    assert_eq!(StatusCode::OK, res.status());
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_login_logout() {
    let server = serve().await;

    let res = server.login("admin", "wrong").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    assert_eq!("AuthError", error_code(res).await);

    let token = server.token().await;
    let res = server
        .client
        .get(server.url(api::path::SYS_USER_INFO))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let info = res.json::<api::response::UserInfo>().await.unwrap();
    assert_eq!("admin", info.username);
    assert_eq!("admin", info.role);

    let res = server
        .client
        .post(server.url(api::path::SYS_LOGOUT))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = server
        .client
        .get(server.url(api::path::SYS_USER_INFO))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = server.get(api::path::SYS_USER_INFO).await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn test_modify_password() {
    let server = serve().await;
    let token = server.token().await;
    let other = server.token().await;

    let res = server
        .post(
            &token,
            api::path::SYS_MODIFY_PASSWORD,
            &api::request::ModifyPassword {
                old_password: "nope".to_string(),
                new_password: "next".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = server
        .post(
            &token,
            api::path::SYS_MODIFY_PASSWORD,
            &api::request::ModifyPassword {
                old_password: common::PASSWORD.to_string(),
                new_password: "next".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    assert_eq!(
        StatusCode::UNAUTHORIZED,
        server.login("admin", common::PASSWORD).await.status()
    );
    assert_eq!(StatusCode::OK, server.login("admin", "next").await.status());

    // Other sessions of the user are revoked
    let res = server.stream_start(&other, "cam1").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    let res = server.stream_start(&token, "cam1").await;
    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn test_session_idle_timeout() {
    let server = serve_with(|cfg| {
        cfg.session.idle_timeout = 1;
        cfg.session.sweep_interval = 1;
    })
    .await;
    let token = server.token().await;
    assert_eq!(StatusCode::OK, server.stream_start(&token, "cam1").await.status());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let res = server.stream_start(&token, "cam2").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn test_stream_record_scenario() {
    let server = serve().await;
    let token = server.token().await;

    let res = server.stream_start(&token, "cam1").await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(
        "cam1",
        res.json::<api::response::Id>().await.unwrap().id
    );

    let res = server
        .post(
            &token,
            api::path::STREAM_PLAY,
            &api::request::Play {
                stream: "cam1".to_string(),
                trans_type: Default::default(),
            },
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());

    let res = server
        .post(
            &token,
            api::path::RECORD_START,
            &api::request::StartRecord {
                stream: "cam1".to_string(),
                path: "/rec/cam1.mp4".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    let task = res.json::<api::response::Id>().await.unwrap().id;

    let res = server
        .client
        .post(server.url(&api::path::push("cam1")))
        .bearer_auth(&token)
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = server
        .post(
            &token,
            api::path::STREAM_STOP,
            &api::request::Id {
                id: "cam1".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = server
        .post(
            &token,
            api::path::STREAM_STOP,
            &api::request::Id {
                id: "cam1".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());
    assert_eq!("NotFound", error_code(res).await);

    let players = server
        .get(&api::path::players(&Default::default()))
        .await
        .json::<api::response::Page<api::response::Player>>()
        .await
        .unwrap();
    assert_eq!(0, players.total);

    let tasks = server
        .get(api::path::RECORD_TASKS)
        .await
        .json::<Vec<api::response::RecordTask>>()
        .await
        .unwrap();
    assert_eq!(1, tasks.len());
    assert_eq!(task, tasks[0].id);
    assert_eq!(api::response::RecordStatus::Stopped, tasks[0].status);

    let folders = server
        .get(api::path::RECORD_FOLDERS)
        .await
        .json::<api::response::RecordFolders>()
        .await
        .unwrap();
    assert_eq!(vec!["/rec".to_string()], folders.folders);

    let files = server
        .get(&api::path::record_files("/rec"))
        .await
        .json::<api::response::RecordFiles>()
        .await
        .unwrap();
    assert!(files.files.iter().any(|f| f.name == "cam1.mp4"));
}

#[tokio::test]
async fn test_record_unknown_stream() {
    let server = serve().await;
    let token = server.token().await;

    let res = server
        .post(
            &token,
            api::path::RECORD_START,
            &api::request::StartRecord {
                stream: "ghost".to_string(),
                path: "/rec/ghost.mp4".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let tasks = server
        .get(api::path::RECORD_TASKS)
        .await
        .json::<Vec<api::response::RecordTask>>()
        .await
        .unwrap();
    assert!(tasks.is_empty());

    let res = server.get(&api::path::record_files("/rec")).await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn test_stream_start_race() {
    let server = serve().await;
    let token = server.token().await;

    let results = futures_join(&server, &token, "race", 8).await;
    assert_eq!(1, results.iter().filter(|s| **s == StatusCode::OK).count());
    assert_eq!(
        7,
        results
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count()
    );
}

async fn futures_join(server: &Server, token: &str, id: &str, n: usize) -> Vec<StatusCode> {
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let client = server.client.clone();
            let url = server.url(api::path::STREAM_START);
            let token = token.to_string();
            let id = id.to_string();
            tokio::spawn(async move {
                client
                    .post(url)
                    .bearer_auth(token)
                    .json(&api::request::StreamStart {
                        id: Some(id),
                        ..Default::default()
                    })
                    .send()
                    .await
                    .unwrap()
                    .status()
            })
        })
        .collect();
    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

#[tokio::test]
async fn test_viewer_access() {
    let server = serve().await;
    let admin = server.token().await;
    let res = server.login("guest", "guest").await;
    let guest = res.json::<api::response::Token>().await.unwrap().token;

    assert_eq!(
        StatusCode::UNAUTHORIZED,
        server.stream_start(&guest, "cam1").await.status()
    );
    assert_eq!(StatusCode::OK, server.stream_start(&admin, "cam1").await.status());

    let res = server
        .post(
            &guest,
            api::path::STREAM_PLAY,
            &api::request::Play {
                stream: "/cam1".to_string(),
                trans_type: api::response::TransType::Udp,
            },
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());

    let players = server
        .get(api::path::PLAYERS)
        .await
        .json::<api::response::Page<api::response::Player>>()
        .await
        .unwrap();
    assert_eq!(1, players.total);
    assert_eq!("/cam1", players.rows[0].path);
    assert_eq!(api::response::TransType::Udp, players.rows[0].trans_type);
}

#[tokio::test]
async fn test_pushers_page_and_stats() {
    let server = serve().await;
    let token = server.token().await;
    for id in ["cam3", "cam1", "door", "cam2"] {
        assert_eq!(StatusCode::OK, server.stream_start(&token, id).await.status());
    }

    let page = pushers(
        &server,
        &api::request::PageQuery {
            q: Some("cam".to_string()),
            sort: Some("id".to_string()),
            order: Some("descending".to_string()),
            limit: Some(2),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(3, page.total);
    let ids: Vec<_> = page.rows.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(vec!["cam3", "cam2"], ids);

    let all = pushers(&server, &Default::default()).await;
    let stats = server
        .get(api::path::STATS)
        .await
        .json::<api::response::Stats>()
        .await
        .unwrap();
    assert_eq!(all.total, stats.pusher_count);
    assert_eq!(4, stats.pusher_count);

    let info = server
        .get(api::path::SYS_SERVER_INFO)
        .await
        .json::<api::response::ServerInfo>()
        .await
        .unwrap();
    assert_eq!(4, info.stats.pusher_count);
    assert_eq!("V1", info.interface_version);

    let res = server.get(api::path::METRICS).await;
    assert_eq!(StatusCode::OK, res.status());
    assert!(res.text().await.unwrap().contains("livectl_pusher"));
}

#[tokio::test]
async fn test_stream_idle_timeout() {
    let server = serve_with(|cfg| cfg.stream.check_interval = 100).await;
    let token = server.token().await;
    let res = server
        .post(
            &token,
            api::path::STREAM_START,
            &api::request::StreamStart {
                id: Some("idle".to_string()),
                idle_timeout: 1,
                ..Default::default()
            },
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(1, pushers(&server, &Default::default()).await.total);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(0, pushers(&server, &Default::default()).await.total);
}

#[tokio::test]
async fn test_malformed_request() {
    let server = serve().await;
    let token = server.token().await;

    let res = server
        .post(&token, api::path::STREAM_STOP, &serde_json::json!({}))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!("BadRequest", error_code(res).await);

    let res = server
        .client
        .post(server.url(api::path::STREAM_START))
        .bearer_auth(&token)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!("BadRequest", error_code(res).await);

    let res = server
        .client
        .post(server.url(api::path::STREAM_PUSH))
        .bearer_auth(&token)
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!("BadRequest", error_code(res).await);

    let res = server
        .get(&format!("{}?limit=many", api::path::PUSHERS))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!("BadRequest", error_code(res).await);
}

#[tokio::test]
async fn test_pull_stream_restart() {
    let dir = tempfile::tempdir().unwrap();
    let pull_file = dir.path().join("pull.json");

    let first = serve_with(|cfg| cfg.stream.pull_file = Some(pull_file.clone())).await;
    let token = first.token().await;
    let res = first
        .post(
            &token,
            api::path::STREAM_START,
            &api::request::StreamStart {
                id: Some("gate".to_string()),
                url: Some("rtsp://10.0.0.2/gate".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(StatusCode::OK, first.stream_start(&token, "door").await.status());

    // A second server on the same file comes up with the pull stream only
    let second = serve_with(|cfg| cfg.stream.pull_file = Some(pull_file.clone())).await;
    let page = pushers(&second, &Default::default()).await;
    assert_eq!(1, page.total);
    assert_eq!("gate", page.rows[0].id);
    assert_eq!(api::response::PusherMode::Pull, page.rows[0].mode);
    assert_eq!("rtsp://10.0.0.2/gate", page.rows[0].source);

    // An explicit stop forgets it
    let res = second
        .post(
            &second.token().await,
            api::path::STREAM_STOP,
            &api::request::Id {
                id: "gate".to_string(),
            },
        )
        .await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());
    let third = serve_with(|cfg| cfg.stream.pull_file = Some(pull_file.clone())).await;
    assert_eq!(0, pushers(&third, &Default::default()).await.total);
}

#[tokio::test]
async fn test_server_info_usage() {
    let server = serve_with(|cfg| cfg.stats.sample_interval = 1).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let info = server
        .get(api::path::SYS_SERVER_INFO)
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let mem = info["memData"].as_array().unwrap();
    let cpu = info["cpuData"].as_array().unwrap();
    assert!(!mem.is_empty());
    assert_eq!(mem.len(), cpu.len());
    for sample in mem.iter().chain(cpu) {
        let used = sample["used"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&used));
        assert!(sample["time"].is_string());
    }
}

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use livectl::config::{Account, Config};
use serde::Serialize;
use tokio::net::TcpListener;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "pw";

pub struct Server {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl Server {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url(api::path::SYS_LOGIN))
            .json(&api::request::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .unwrap()
    }

    pub async fn token(&self) -> String {
        let res = self.login(USERNAME, PASSWORD).await;
        assert_eq!(http::StatusCode::OK, res.status());
        res.json::<api::response::Token>().await.unwrap().token
    }

    pub async fn post<T: Serialize>(
        &self,
        token: &str,
        path: &str,
        body: &T,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn stream_start(&self, token: &str, id: &str) -> reqwest::Response {
        self.post(
            token,
            api::path::STREAM_START,
            &api::request::StreamStart {
                id: Some(id.to_string()),
                ..Default::default()
            },
        )
        .await
    }
}

pub async fn serve() -> Server {
    serve_with(|_| {}).await
}

pub async fn serve_with(f: impl FnOnce(&mut Config)) -> Server {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.auth.accounts = vec![
        Account {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            ..Default::default()
        },
        Account {
            username: "guest".to_string(),
            password: "guest".to_string(),
            role: auth::Role::Viewer,
        },
    ];
    cfg.record.root = dir.path().to_path_buf();
    cfg.stream.pull_file = Some(dir.path().join("pull.json"));
    f(&mut cfg);

    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(livectl::serve(cfg, listener, std::future::pending()));

    Server {
        addr,
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

use std::io::Write;

use tracing::{debug, error};

use crate::{
    api::{ApiError, GitHub, Invitation, Token},
    console::Console,
};

/// What happened to a single invitation.
#[derive(Debug, Clone, PartialEq)]
pub enum Acceptance {
    Accepted,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub failed: usize,
    pub total: usize,
}

impl Summary {
    pub fn record(&mut self, acceptance: &Acceptance) {
        match acceptance {
            Acceptance::Accepted => self.accepted += 1,
            Acceptance::Failed(_) => self.failed += 1,
        }
        self.total += 1;
    }
}

/// Checks the token against `GET /user`. Prints who we're logged in as.
pub async fn validate_token<G: GitHub, W: Write>(
    github: &G,
    token: &Token,
    console: &mut Console<W>,
) -> bool {
    match github.current_user(token).await {
        Ok(user) => {
            console.line(format!("Logged in as: {}", user.login));
            true
        }
        Err(ApiError::BadResponse { status, .. }) => {
            debug!("token rejected with {}", status);
            console.line("Invalid token");
            false
        }
        Err(e) => {
            error!("{}", e);
            console.line("Connection error");
            false
        }
    }
}

/// Fetches the pending invitations and prints them.
pub async fn list_invitations<G: GitHub, W: Write>(
    github: &G,
    token: &Token,
    console: &mut Console<W>,
) -> Result<Vec<Invitation>, ApiError> {
    console.line("Looking for pending invitations...");
    let invitations = github.list_invitations(token).await?;

    if invitations.is_empty() {
        console.line("No pending invitations.");
        return Ok(invitations);
    }

    console.line(format!("Found {} invitation(s).", invitations.len()));
    console.line("Repositories:");
    for invitation in &invitations {
        console.line(format!("   - {}", invitation.repository.full_name));
    }

    Ok(invitations)
}

/// Accepts every invitation in order. A failure is counted and the loop
/// moves on to the next one.
pub async fn accept_invitations<G: GitHub, W: Write>(
    github: &G,
    token: &Token,
    invitations: &[Invitation],
    console: &mut Console<W>,
) -> Summary {
    console.blank();
    console.line("Accepting...");

    let mut summary = Summary::default();
    for invitation in invitations {
        let name = &invitation.repository.full_name;
        let acceptance = match github.accept_invitation(token, invitation.id).await {
            Ok(()) => {
                console.line(format!("Accepted {}", name));
                Acceptance::Accepted
            }
            Err(ApiError::BadResponse { status, .. }) => {
                console.line(format!("Failed {} (code: {})", name, status.as_u16()));
                Acceptance::Failed(status.to_string())
            }
            Err(e) => {
                console.line(format!("Failed {}: {}", name, e));
                Acceptance::Failed(e.to_string())
            }
        };
        if let Acceptance::Failed(reason) = &acceptance {
            debug!("invitation {} not accepted: {}", invitation.id, reason);
        }
        summary.record(&acceptance);
    }

    console.blank();
    console.line("Summary:");
    console.line(format!("   Accepted: {}", summary.accepted));
    console.line(format!("   Failed: {}", summary.failed));
    console.line(format!("   Total: {}", invitations.len()));

    summary
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::{Repository, User};

    pub(crate) fn invitation(id: u64, full_name: &str) -> Invitation {
        Invitation {
            id,
            repository: Repository {
                full_name: full_name.to_string(),
            },
        }
    }

    pub(crate) enum Identity {
        Login(&'static str),
        Status(StatusCode),
        Unreachable,
    }

    /// In-memory GitHub. Remembers every call it receives.
    pub(crate) struct FakeGitHub {
        pub identity: Identity,
        pub invitations: Result<Vec<Invitation>, StatusCode>,
        pub accept_status: Vec<(u64, StatusCode)>,
        // ids whose PATCH never reaches the server
        pub unreachable_accepts: Vec<u64>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeGitHub {
        pub fn new(invitations: Vec<Invitation>) -> FakeGitHub {
            FakeGitHub {
                identity: Identity::Login("alice"),
                invitations: Ok(invitations),
                accept_status: vec![],
                unreachable_accepts: vec![],
                calls: Mutex::new(vec![]),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn patches(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| c.starts_with("PATCH"))
                .collect()
        }

        // reqwest errors can't be built by hand, a refused connection is the next best thing
        async fn refused(request: &str) -> ApiError {
            let err = reqwest::Client::new()
                .get(format!("http://127.0.0.1:1{}", request))
                .send()
                .await
                .unwrap_err();
            ApiError::FailedToConnect(err)
        }

        fn bad(status: StatusCode, request: &str) -> ApiError {
            ApiError::BadResponse {
                status,
                request: request.to_string(),
            }
        }
    }

    #[async_trait]
    impl GitHub for FakeGitHub {
        async fn current_user(&self, token: &Token) -> Result<User, ApiError> {
            self.calls.lock().unwrap().push("GET /user".to_string());
            assert_eq!(token.secret(), "tok123");
            match self.identity {
                Identity::Login(login) => Ok(User {
                    login: login.to_string(),
                }),
                Identity::Status(status) => Err(FakeGitHub::bad(status, "GET /user")),
                Identity::Unreachable => Err(FakeGitHub::refused("/user").await),
            }
        }

        async fn list_invitations(&self, _token: &Token) -> Result<Vec<Invitation>, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push("GET /user/repository_invitations".to_string());
            self.invitations
                .clone()
                .map_err(|status| FakeGitHub::bad(status, "GET /user/repository_invitations"))
        }

        async fn accept_invitation(&self, _token: &Token, id: u64) -> Result<(), ApiError> {
            let request = format!("PATCH /user/repository_invitations/{}", id);
            self.calls.lock().unwrap().push(request.clone());
            if self.unreachable_accepts.contains(&id) {
                let path = format!("/user/repository_invitations/{}", id);
                return Err(FakeGitHub::refused(&path).await);
            }
            let status = self
                .accept_status
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, s)| *s)
                .unwrap_or(StatusCode::NO_CONTENT);
            if status == StatusCode::NO_CONTENT {
                Ok(())
            } else {
                Err(FakeGitHub::bad(status, &request))
            }
        }
    }

    fn token() -> Token {
        Token::new("tok123").unwrap()
    }

    #[tokio::test]
    async fn test_validate_reports_login() {
        let github = FakeGitHub::new(vec![]);
        let mut console = Console::buffered();

        assert!(validate_token(&github, &token(), &mut console).await);
        assert!(console.text().contains("Logged in as: alice"));
    }

    #[tokio::test]
    async fn test_validate_rejects_non_200() {
        let mut github = FakeGitHub::new(vec![]);
        github.identity = Identity::Status(StatusCode::UNAUTHORIZED);
        let mut console = Console::buffered();

        assert!(!validate_token(&github, &token(), &mut console).await);
        assert!(console.text().contains("Invalid token"));
    }

    #[tokio::test]
    async fn test_validate_reports_connection_errors() {
        let mut github = FakeGitHub::new(vec![]);
        github.identity = Identity::Unreachable;
        let mut console = Console::buffered();

        assert!(!validate_token(&github, &token(), &mut console).await);
        assert!(console.text().contains("Connection error"));
    }

    #[tokio::test]
    async fn test_list_prints_each_repository() {
        let github = FakeGitHub::new(vec![invitation(1, "org/a"), invitation(2, "org/b")]);
        let mut console = Console::buffered();

        let invitations = list_invitations(&github, &token(), &mut console)
            .await
            .unwrap();

        let text = console.text();
        assert_eq!(invitations.len(), 2);
        assert!(text.contains("Found 2 invitation(s)."));
        assert!(text.contains("   - org/a\n   - org/b\n"));
    }

    #[tokio::test]
    async fn test_list_empty() {
        let github = FakeGitHub::new(vec![]);
        let mut console = Console::buffered();

        let invitations = list_invitations(&github, &token(), &mut console)
            .await
            .unwrap();

        assert!(invitations.is_empty());
        assert!(console.text().contains("No pending invitations."));
    }

    #[tokio::test]
    async fn test_list_propagates_bad_status() {
        let mut github = FakeGitHub::new(vec![]);
        github.invitations = Err(StatusCode::FORBIDDEN);
        let mut console = Console::buffered();

        let err = list_invitations(&github, &token(), &mut console)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadResponse { status, .. } if status == StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let invitations = vec![
            invitation(1, "org/a"),
            invitation(2, "org/b"),
            invitation(3, "org/c"),
        ];
        let mut github = FakeGitHub::new(invitations.clone());
        github.accept_status = vec![(2, StatusCode::NOT_FOUND)];
        let mut console = Console::buffered();

        let summary = accept_invitations(&github, &token(), &invitations, &mut console).await;

        assert_eq!(
            summary,
            Summary {
                accepted: 2,
                failed: 1,
                total: 3
            }
        );
        assert_eq!(
            github.patches(),
            vec![
                "PATCH /user/repository_invitations/1",
                "PATCH /user/repository_invitations/2",
                "PATCH /user/repository_invitations/3",
            ]
        );
        let text = console.text();
        assert!(text.contains("Accepted org/a"));
        assert!(text.contains("Failed org/b (code: 404)"));
        assert!(text.contains("Accepted org/c"));
        assert!(text.contains("   Total: 3"));
    }

    #[tokio::test]
    async fn test_transport_error_counts_as_failed_and_continues() {
        let invitations = vec![
            invitation(1, "org/a"),
            invitation(2, "org/b"),
            invitation(3, "org/c"),
        ];
        let mut github = FakeGitHub::new(invitations.clone());
        github.unreachable_accepts = vec![2];
        let mut console = Console::buffered();

        let summary = accept_invitations(&github, &token(), &invitations, &mut console).await;

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.accepted + summary.failed, summary.total);
        assert_eq!(summary.total, invitations.len());
        assert_eq!(
            github.patches().last().map(String::as_str),
            Some("PATCH /user/repository_invitations/3")
        );
        let text = console.text();
        assert!(text.contains("Failed org/b: Failed to connect to GitHub"));
        assert!(text.contains("Accepted org/c"));
    }

    #[tokio::test]
    async fn test_validate_treats_undecodable_user_as_connection_error() {
        use axum::{routing::get, Json, Router};
        use serde_json::json;

        use crate::{
            api::ApiClient,
            config::{ApiConfig, GlobalConfig},
        };

        let app = Router::new().route("/user", get(|| async { Json(json!({"id": 7})) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = ApiClient::new(&GlobalConfig {
            api: Some(ApiConfig {
                host: Some(format!("http://{}", addr)),
                accept: None,
                request_timeout_secs: Some(5),
            }),
            credentials: None,
        })
        .unwrap();
        let mut console = Console::buffered();

        assert!(!validate_token(&client, &token(), &mut console).await);
        let text = console.text();
        assert!(text.contains("Connection error"));
        assert!(!text.contains("Invalid token"));
    }

    #[test]
    fn test_summary_counts_add_up() {
        let outcomes = vec![
            Acceptance::Accepted,
            Acceptance::Failed("404 Not Found".to_string()),
            Acceptance::Accepted,
            Acceptance::Failed("timed out".to_string()),
            Acceptance::Failed("500".to_string()),
        ];

        let mut summary = Summary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.accepted + summary.failed, summary.total);
        assert_eq!(summary.total, outcomes.len());
    }
}

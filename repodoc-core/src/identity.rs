//! Resolving who the access token belongs to.

use tracing::{error, info};

use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::Principal;
use crate::session::{GenerationProgress, Session};

/// Resolve the principal behind the session's credential and record it on the session.
///
/// On failure the session forgets both the principal and any repositories listed
/// under a previous identity.
///
/// Any answer from the server other than success is an [`DocgenError::AuthenticationFailed`],
/// whatever the status. Failing to reach the server at all stays a network failure.
pub async fn fetch_current_user<A>(api: &A, session: &mut Session) -> Result<Principal>
where
    A: GitHubApi + ?Sized,
{
    if session.credential().is_none() {
        return Err(DocgenError::MissingCredential);
    }
    session.cancel_flag().check()?;

    let principal = api.current_user().await.map_err(|e| match e {
        DocgenError::NetworkFailure {
            status: Some(status),
            ..
        } => DocgenError::AuthenticationFailed {
            status: Some(status),
        },
        other => other,
    });

    match principal {
        Ok(principal) => {
            info!(login = %principal.login, id = principal.id, "Authenticated");
            session.set_principal(Some(principal.clone()));
            session.emit(GenerationProgress::Authenticated {
                login: principal.login.clone(),
            });
            Ok(principal)
        }
        Err(e) => {
            error!(error = %e, "Could not resolve the authenticated user");
            session.set_principal(None);
            session.set_repositories(Vec::new());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockGitHubApi;
    use crate::session::Credential;
    use crate::testing::repository;

    fn principal() -> Principal {
        Principal {
            login: "octocat".into(),
            id: 583231,
            name: Some("The Octocat".into()),
            email: None,
            avatar_url: None,
            html_url: Some("https://github.com/octocat".into()),
            public_repos: Some(8),
        }
    }

    #[tokio::test]
    async fn success_records_the_principal() {
        let mut api = MockGitHubApi::new();
        api.expect_current_user().times(1).returning(|| Ok(principal()));
        let mut session = Session::new(Credential::new("ghp_x"));

        let user = fetch_current_user(&api, &mut session).await.unwrap();

        assert_eq!(user.login, "octocat");
        assert!(session.is_authenticated());
        assert_eq!(session.principal().unwrap().id, 583231);
    }

    #[tokio::test]
    async fn server_errors_count_as_authentication_failures() {
        for status in [401u16, 403, 503] {
            let mut api = MockGitHubApi::new();
            api.expect_current_user().returning(move || {
                Err(if status == 401 {
                    DocgenError::AuthenticationFailed { status: Some(401) }
                } else {
                    DocgenError::NetworkFailure {
                        url: "https://api.github.com/user".into(),
                        status: Some(status),
                        reason: "nope".into(),
                    }
                })
            });
            let mut session = Session::new(Credential::new("ghp_x"));

            let err = fetch_current_user(&api, &mut session).await.unwrap_err();

            assert!(matches!(
                err,
                DocgenError::AuthenticationFailed { status: Some(s) } if s == status
            ));
            assert!(!session.is_authenticated());
        }
    }

    #[tokio::test]
    async fn failure_forgets_previously_listed_repositories() {
        let mut api = MockGitHubApi::new();
        api.expect_current_user()
            .returning(|| Err(DocgenError::AuthenticationFailed { status: Some(401) }));
        let mut session = Session::new(Credential::new("ghp_revoked"));
        session.set_principal(Some(principal()));
        session.set_repositories(vec![repository(1, "octocat", "hello")]);

        fetch_current_user(&api, &mut session).await.unwrap_err();

        assert!(!session.is_authenticated());
        assert!(session.repositories().is_empty());
        assert!(session.snapshot().repositories.is_empty());
    }

    #[tokio::test]
    async fn transport_errors_stay_network_failures() {
        let mut api = MockGitHubApi::new();
        api.expect_current_user().returning(|| {
            Err(DocgenError::NetworkFailure {
                url: "https://api.github.com/user".into(),
                status: None,
                reason: "dns error".into(),
            })
        });
        let mut session = Session::new(Credential::new("ghp_x"));

        let err = fetch_current_user(&api, &mut session).await.unwrap_err();
        assert!(matches!(err, DocgenError::NetworkFailure { status: None, .. }));
    }

    #[tokio::test]
    async fn missing_credential_issues_no_request() {
        let mut api = MockGitHubApi::new();
        api.expect_current_user().never();
        let mut session = Session::new(None);

        let err = fetch_current_user(&api, &mut session).await.unwrap_err();
        assert!(matches!(err, DocgenError::MissingCredential));
    }
}

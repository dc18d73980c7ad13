mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use common::*;
use zuno::app::{LearningApp, View};
use zuno::auth::{GateDecision, Route, SessionState, SessionStore};
use zuno::chat::GREETING;
use zuno::config::Config;
use zuno::models::*;

mod session_gate {
    use super::*;

    #[tokio::test]
    async fn signed_out_views_redirect_without_requests() {
        let h = Harness::new().await;

        assert!(matches!(h.app.dashboard().await.unwrap(), View::Redirect(Route::Login)));
        assert!(matches!(h.app.progress_view().await.unwrap(), View::Redirect(Route::Login)));
        assert!(matches!(h.app.weekly_summary().await.unwrap(), View::Redirect(Route::Login)));
        assert!(matches!(h.app.task(1).await.unwrap(), View::Redirect(Route::Login)));
        assert!(matches!(h.app.send_chat("hi").await.unwrap(), View::Redirect(Route::Login)));
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn public_routes_render_without_session() {
        let h = Harness::new().await;

        assert_eq!(h.app.gate().check(Route::Login).await, GateDecision::Render);
        assert_eq!(h.app.gate().check(Route::Signup).await, GateDecision::Render);
        assert_eq!(
            h.app.gate().check(Route::Entry).await,
            GateDecision::Redirect(Route::Login)
        );
    }

    #[tokio::test]
    async fn mounted_view_redirects_on_sign_out() {
        let h = Harness::signed_in().await;
        let mut view = h.app.gate().mount(Route::Progress).await.ok().unwrap();

        h.app.session().sign_out().await;

        assert_eq!(view.changed().await, GateDecision::Redirect(Route::Login));
        assert_eq!(view.route(), Route::Progress);
    }

    #[tokio::test]
    async fn mounted_view_stays_on_sign_in() {
        let h = Harness::new().await;
        let mut view = h.app.gate().mount(Route::Login).await.ok().unwrap();

        h.app.sign_in("learner@example.com", "secret").await.unwrap();

        assert_eq!(view.changed().await, GateDecision::Render);
    }

    #[tokio::test]
    async fn expired_but_refreshable_session_is_rotated_not_redirected() {
        let h = Harness::with_session(expired_session()).await;
        h.app.sign_in("learner@example.com", "secret").await.unwrap();

        let view = h.app.dashboard().await.unwrap();

        assert!(matches!(view, View::Ready(_)));
        assert_eq!(h.identity.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.app.session().current_session().map(|s| s.access_token),
            Some("rotated".to_string())
        );
        assert_eq!(
            h.backend.requests_to("/daily-plan")[0].authorization.as_deref(),
            Some("Bearer rotated")
        );
    }

    #[tokio::test]
    async fn expired_session_that_cannot_rotate_redirects() {
        let h = Harness::with_session(expired_session()).await;
        h.identity.fail_refresh.store(true, Ordering::SeqCst);
        h.app.sign_in("learner@example.com", "secret").await.unwrap();

        assert!(matches!(h.app.dashboard().await.unwrap(), View::Redirect(Route::Login)));
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn resolution_is_observable() {
        let identity = Arc::new(StaticIdentity::new(live_session()));
        let store = SessionStore::new(identity, None);
        let rx = store.subscribe();

        assert_eq!(*rx.borrow(), SessionState::Resolving);
        assert!(!store.is_resolved());

        assert!(store.initialize().await.is_none());
        assert!(store.is_resolved());
        assert_eq!(*rx.borrow(), SessionState::Resolved(None));
    }
}

mod persisted_session {
    use super::*;

    #[tokio::test]
    async fn survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = live_session();

        let first = SessionStore::new(Arc::new(StaticIdentity::new(session.clone())), Some(path.clone()));
        first.sign_in("learner@example.com", "secret").await.unwrap();

        let second = SessionStore::new(Arc::new(StaticIdentity::new(live_session())), Some(path));
        assert_eq!(second.initialize().await, Some(session));
    }

    #[tokio::test]
    async fn expired_session_is_rotated_on_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, serde_json::to_string(&expired_session()).unwrap()).unwrap();
        let identity = Arc::new(StaticIdentity::new(live_session()));
        let store = SessionStore::new(identity.clone(), Some(path));

        let session = store.initialize().await.unwrap();

        assert_eq!(session.access_token, "rotated");
        assert_eq!(identity.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_file_resolves_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(Arc::new(StaticIdentity::new(live_session())), Some(path));

        assert!(store.initialize().await.is_none());
        assert!(store.is_resolved());
    }

    #[tokio::test]
    async fn sign_out_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(Arc::new(StaticIdentity::new(live_session())), Some(path.clone()));
        store.sign_in("learner@example.com", "secret").await.unwrap();
        assert!(path.exists());

        store.sign_out().await;

        assert!(!path.exists());
        assert!(store.current_session().is_none());
    }
}

mod logout {
    use super::*;

    #[tokio::test]
    async fn clears_every_local_projection() {
        let h = Harness::signed_in().await;
        h.backend
            .reply("/daily-plan", Reply::ok(json!([task_json(42, "Closures", false)])));
        h.app.dashboard().await.unwrap();
        h.app.submit(42, "done", None).await.unwrap();
        h.app.send_chat("thanks").await.unwrap();

        h.app.logout().await;

        assert_eq!(h.identity.sign_outs.load(Ordering::SeqCst), 1);
        assert!(h.app.session().current_session().is_none());
        assert!(!h.app.registry().is_loaded());
        assert!(h.app.progress().cached().is_none());
        assert_eq!(h.app.chat().turns(), vec![ChatTurn::mentor(GREETING)]);
        assert!(h.app.feedback_slot().take(42).is_none());
    }

    #[tokio::test]
    async fn revokes_a_persisted_session_in_a_fresh_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, serde_json::to_string(&live_session()).unwrap()).unwrap();
        let h = Harness::with_session_file(live_session(), path.clone()).await;

        h.app.logout().await;

        assert_eq!(h.identity.sign_outs.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
        assert!(h.app.session().current_session().is_none());
    }

    #[tokio::test]
    async fn later_views_redirect_without_requests() {
        let h = Harness::signed_in().await;
        h.app.dashboard().await.unwrap();
        h.app.logout().await;
        h.backend.reset_requests();

        assert!(matches!(h.app.dashboard().await.unwrap(), View::Redirect(Route::Login)));
        assert!(h.app.feedback(42).await.ready().is_none());
        assert!(h.backend.requests().is_empty());
    }
}

mod weekly {
    use super::*;

    #[tokio::test]
    async fn combines_mentor_text_with_snapshot() {
        let h = Harness::signed_in().await;
        h.backend.reply(
            "/weekly-summary",
            Reply::ok(json!({ "mentor_summary_text": "You showed up five days out of seven." })),
        );
        h.backend
            .reply("/progress", Reply::ok(progress_json(5, 7, 5, 71.4, 88.0)));

        let report = h.app.weekly_summary().await.unwrap().ready().flatten().unwrap();

        assert_eq!(report.mentor_text(), "You showed up five days out of seven.");
        assert_eq!(report.snapshot.completed_tasks, 5);
        assert_eq!(h.app.progress().cached(), Some(report.snapshot.clone()));
    }

    #[tokio::test]
    async fn account_without_goals_gets_empty_state() {
        let h = Harness::signed_in().await;
        h.backend.reply(
            "/weekly-summary",
            Reply::status(400, json!({ "detail": "User has no goals set" })),
        );
        h.backend.reply(
            "/progress",
            Reply::status(400, json!({ "detail": "User has no goals set" })),
        );

        assert!(matches!(h.app.weekly_summary().await.unwrap(), View::Ready(None)));
    }

    #[tokio::test]
    async fn server_failure_is_still_an_error() {
        let h = Harness::signed_in().await;
        h.backend
            .reply("/weekly-summary", Reply::status(500, json!({ "error": "boom" })));

        assert!(h.app.weekly_summary().await.is_err());
    }

    #[tokio::test]
    async fn missing_mentor_text_falls_back() {
        let h = Harness::signed_in().await;
        h.backend.reply("/weekly-summary", Reply::ok(json!({})));

        let report = h.app.weekly_summary().await.unwrap().ready().flatten().unwrap();

        assert_eq!(report.mentor_text(), DEFAULT_WEEKLY_TEXT);
    }
}

#[test]
fn building_from_config_requires_identity_provider() {
    assert!(LearningApp::from_config(&Config::default()).is_err());
}

mod progress {
    use super::*;

    #[tokio::test]
    async fn shows_the_snapshot() {
        let h = Harness::signed_in().await;
        h.backend
            .reply("/progress", Reply::ok(progress_json(3, 9, 4, 44.4, 72.0)));

        let snapshot = h.app.progress_view().await.unwrap().ready().flatten().unwrap();

        assert_eq!(snapshot.current_streak, 3);
        assert_eq!(snapshot.completed_tasks, 4);
    }

    #[tokio::test]
    async fn account_without_goals_gets_empty_state() {
        let h = Harness::signed_in().await;
        h.backend.reply(
            "/progress",
            Reply::status(400, json!({ "detail": "User has no goals set" })),
        );

        assert!(matches!(h.app.progress_view().await.unwrap(), View::Ready(None)));
        assert!(h.app.progress().cached().is_none());
    }

    #[tokio::test]
    async fn no_goals_keeps_the_cached_snapshot() {
        let h = Harness::signed_in().await;
        h.backend
            .enqueue("/progress", Reply::ok(progress_json(2, 4, 2, 50.0, 90.0)));
        h.backend.enqueue(
            "/progress",
            Reply::status(400, json!({ "detail": "User has no goals set" })),
        );
        h.app.progress().snapshot().await.unwrap();

        let err = h.app.progress().snapshot().await.unwrap_err();

        assert!(err.is_no_goals());
        assert_eq!(h.app.progress().cached().map(|p| p.current_streak), Some(2));
    }

    #[tokio::test]
    async fn server_failure_is_still_an_error() {
        let h = Harness::signed_in().await;
        h.backend
            .reply("/progress", Reply::status(503, json!({ "error": "down" })));

        assert!(h.app.progress_view().await.is_err());
    }
}

//! Integration tests for the policy-groups service.
//!
//! These tests run against an in-memory `SQLite` database with the real
//! repository, codec, and migrations; only the authorization engine is
//! mocked. The mock records every evaluation so tests can assert not
//! just outcomes but which checks were (or were not) planned.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use policy_groups_sdk::{
        Action, AuthorizationEngine, AuthzEngineError, Container, LookupState, ObjectKind,
        PermissionCheck, Prerequisite, PutOutcome, Requestor, Verdict,
    };

    use crate::domain::codec::GzipCodec;
    use crate::domain::error::DomainError;
    use crate::domain::repo::{PolicyRow, PolicyStoreRepository};
    use crate::domain::service::{Service, ServiceConfig};
    use crate::domain::validate::ValidationError;
    use crate::infra::storage::migrations::Migrator;
    use crate::infra::storage::sea_orm_repo::SeaOrmPolicyStore;

    type ConcreteService = Service<SeaOrmPolicyStore>;

    /// Mock authorization engine.
    ///
    /// Records every evaluated check list; grants or denies everything
    /// depending on how it was built. `create_identity` mints random
    /// ids like the real engine would.
    struct MockEngine {
        deny: bool,
        calls: Mutex<Vec<Vec<PermissionCheck>>>,
    }

    impl MockEngine {
        fn granting() -> Arc<Self> {
            Arc::new(Self {
                deny: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn denying() -> Arc<Self> {
            Arc::new(Self {
                deny: true,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<PermissionCheck>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthorizationEngine for MockEngine {
        async fn evaluate(
            &self,
            _requestor: &Requestor,
            checks: &[PermissionCheck],
        ) -> Result<Verdict, AuthzEngineError> {
            self.calls.lock().unwrap().push(checks.to_vec());
            if self.deny {
                Ok(Verdict::Denied {
                    check: checks[0].clone(),
                })
            } else {
                Ok(Verdict::Granted)
            }
        }

        async fn create_identity(
            &self,
            _requestor: &Requestor,
        ) -> Result<Uuid, AuthzEngineError> {
            Ok(Uuid::new_v4())
        }
    }

    /// Create an in-memory database with migrations applied.
    ///
    /// A single pooled connection keeps every query on the same
    /// in-memory database.
    async fn inmem_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to in-memory database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        db
    }

    fn build_service(db: DatabaseConnection, engine: Arc<MockEngine>) -> ConcreteService {
        Service::new(
            db,
            Arc::new(SeaOrmPolicyStore::new()),
            engine,
            Arc::new(GzipCodec),
            ServiceConfig::default(),
        )
    }

    fn policy_doc(name: &str, revision_id: &str) -> Value {
        json!({
            "name": name,
            "revision_id": revision_id,
            "run_list": ["recipe[web::default]", "role[base]"],
            "cookbook_locks": {
                "web": {
                    "identifier": "f04cc40faf628253fe7d9566d66a1733fb1afbe9",
                    "version": "1.2.0"
                }
            }
        })
    }

    fn body(doc: &Value) -> Vec<u8> {
        serde_json::to_vec(doc).unwrap()
    }

    fn object_check(object: ObjectKind, authz_id: Uuid, action: Action) -> PermissionCheck {
        PermissionCheck::Object {
            object,
            authz_id,
            action,
        }
    }

    // =========================================================================
    // PUT tests
    // =========================================================================

    #[tokio::test]
    async fn test_put_fresh_creates_policy_group_revision_and_association() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db.clone(), engine.clone());
        let requestor = Requestor::new(Uuid::new_v4());
        let org_id = Uuid::new_v4();
        let doc = policy_doc("web", "rev-1");

        let outcome = service
            .put_named_policy(&requestor, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Created(doc));

        // Both prerequisites were absent: exactly two container checks,
        // never object-permission entries for the same objects.
        assert_eq!(
            engine.calls(),
            vec![vec![
                PermissionCheck::CreateInContainer {
                    container: Container::Policies
                },
                PermissionCheck::CreateInContainer {
                    container: Container::PolicyGroups
                },
            ]]
        );

        let repo = SeaOrmPolicyStore::new();
        let policy = repo.find_policy(&db, org_id, "web").await.unwrap().unwrap();
        let group = repo
            .find_policy_group(&db, org_id, "prod")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.last_modified_by, requestor.actor_id);

        let association = repo
            .find_association(&db, org_id, "web", "prod")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(association.revision_id, "rev-1");
        assert_eq!(association.policy_id, policy.id);
        assert_eq!(association.group_id, group.id);
        // Denormalized copies must equal the source-of-truth rows.
        assert_eq!(association.policy_authz_id, policy.authz_id);
        assert_eq!(association.group_authz_id, group.authz_id);

        let blob = repo
            .find_revision_blob(&db, org_id, "web", "rev-1")
            .await
            .unwrap();
        assert!(blob.is_some());
    }

    #[tokio::test]
    async fn test_put_with_existing_policy_plans_update_and_container() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db.clone(), engine.clone());
        let org_id = Uuid::new_v4();

        // Seed policy + group via a superuser PUT (no engine traffic).
        let superuser = Requestor::superuser(Uuid::new_v4());
        service
            .put_named_policy(
                &superuser,
                org_id,
                "web",
                "prod",
                &body(&policy_doc("web", "rev-1")),
            )
            .await
            .unwrap();
        assert!(engine.calls().is_empty());

        // Same policy into a new group: update on the policy, container
        // check for the missing group.
        let requestor = Requestor::new(Uuid::new_v4());
        service
            .put_named_policy(
                &requestor,
                org_id,
                "web",
                "staging",
                &body(&policy_doc("web", "rev-2")),
            )
            .await
            .unwrap();

        let repo = SeaOrmPolicyStore::new();
        let policy = repo.find_policy(&db, org_id, "web").await.unwrap().unwrap();
        assert_eq!(
            engine.calls(),
            vec![vec![
                object_check(ObjectKind::Policy, policy.authz_id, Action::Update),
                PermissionCheck::CreateInContainer {
                    container: Container::PolicyGroups
                },
            ]]
        );
    }

    #[tokio::test]
    async fn test_reput_replaces_the_revision_reference() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db.clone(), engine.clone());
        let org_id = Uuid::new_v4();

        let superuser = Requestor::superuser(Uuid::new_v4());
        service
            .put_named_policy(
                &superuser,
                org_id,
                "web",
                "prod",
                &body(&policy_doc("web", "rev-1")),
            )
            .await
            .unwrap();

        let requestor = Requestor::new(Uuid::new_v4());
        let doc = policy_doc("web", "rev-2");
        let outcome = service
            .put_named_policy(&requestor, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Updated(doc));

        // Association found: the verb's action on both objects.
        let repo = SeaOrmPolicyStore::new();
        let association = repo
            .find_association(&db, org_id, "web", "prod")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(association.revision_id, "rev-2");
        assert_eq!(
            engine.calls(),
            vec![vec![
                object_check(ObjectKind::Policy, association.policy_authz_id, Action::Update),
                object_check(
                    ObjectKind::PolicyGroup,
                    association.group_authz_id,
                    Action::Update
                ),
            ]]
        );

        // The superseded revision remains stored.
        assert!(
            repo.find_revision_blob(&db, org_id, "web", "rev-1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_reput_of_the_same_document_is_idempotent() {
        let db = inmem_db().await;
        let service = build_service(db.clone(), MockEngine::granting());
        let requestor = Requestor::new(Uuid::new_v4());
        let org_id = Uuid::new_v4();
        let doc = policy_doc("web", "rev-1");

        let first = service
            .put_named_policy(&requestor, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();
        assert_eq!(first, PutOutcome::Created(doc.clone()));

        let repo = SeaOrmPolicyStore::new();
        let before = repo
            .find_association(&db, org_id, "web", "prod")
            .await
            .unwrap()
            .unwrap();

        let second = service
            .put_named_policy(&requestor, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();
        assert_eq!(second, PutOutcome::Updated(doc));

        let after = repo
            .find_association(&db, org_id, "web", "prod")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.revision_id, before.revision_id);
        assert_eq!(after.policy_authz_id, before.policy_authz_id);
        assert_eq!(after.group_authz_id, before.group_authz_id);
    }

    #[tokio::test]
    async fn test_put_rejects_a_body_name_that_differs_from_the_path() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db, engine.clone());
        let requestor = Requestor::new(Uuid::new_v4());

        let err = service
            .put_named_policy(
                &requestor,
                Uuid::new_v4(),
                "web",
                "prod",
                &body(&policy_doc("other", "rev-1")),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::NameMismatch { .. })
        ));
        assert!(engine.calls().is_empty());
    }

    // =========================================================================
    // GET tests
    // =========================================================================

    #[tokio::test]
    async fn test_get_round_trips_the_stored_document() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db, engine.clone());
        let requestor = Requestor::new(Uuid::new_v4());
        let org_id = Uuid::new_v4();
        let doc = policy_doc("web", "rev-1");

        service
            .put_named_policy(&requestor, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();

        let fetched = service
            .fetch_named_policy(&requestor, org_id, "web", "prod")
            .await
            .unwrap();
        assert_eq!(fetched, doc);

        // The GET planned read checks on both objects.
        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            calls[1].as_slice(),
            [
                PermissionCheck::Object {
                    object: ObjectKind::Policy,
                    action: Action::Read,
                    ..
                },
                PermissionCheck::Object {
                    object: ObjectKind::PolicyGroup,
                    action: Action::Read,
                    ..
                },
            ]
        ));
    }

    #[tokio::test]
    async fn test_get_missing_association_halts_without_consulting_the_engine() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db, engine.clone());
        let org_id = Uuid::new_v4();

        // Group exists, policy does not; partial existence must not
        // matter on the read path.
        let superuser = Requestor::superuser(Uuid::new_v4());
        service
            .put_named_policy(
                &superuser,
                org_id,
                "web",
                "prod",
                &body(&policy_doc("web", "rev-1")),
            )
            .await
            .unwrap();

        let requestor = Requestor::new(Uuid::new_v4());
        let err = service
            .fetch_named_policy(&requestor, org_id, "ghost", "prod")
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            DomainError::NotFound { message }
                if message == "Cannot load policy ghost in policy group prod"
        ));
        assert!(engine.calls().is_empty());
    }

    // =========================================================================
    // DELETE tests
    // =========================================================================

    #[tokio::test]
    async fn test_delete_removes_only_the_association() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db.clone(), engine.clone());
        let org_id = Uuid::new_v4();
        let doc = policy_doc("web", "rev-1");

        let superuser = Requestor::superuser(Uuid::new_v4());
        service
            .put_named_policy(&superuser, org_id, "web", "prod", &body(&doc))
            .await
            .unwrap();

        let requestor = Requestor::new(Uuid::new_v4());
        let deleted = service
            .delete_named_policy(&requestor, org_id, "web", "prod")
            .await
            .unwrap();
        assert_eq!(deleted, doc);

        // Deleting the association still required delete rights on both
        // referenced objects.
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            calls[0].as_slice(),
            [
                PermissionCheck::Object {
                    object: ObjectKind::Policy,
                    action: Action::Delete,
                    ..
                },
                PermissionCheck::Object {
                    object: ObjectKind::PolicyGroup,
                    action: Action::Delete,
                    ..
                },
            ]
        ));

        // Policy, group, and revision survive; only the join is gone.
        let lookup = service
            .resolve_association(org_id, "web", "prod")
            .await
            .unwrap();
        assert!(matches!(
            lookup.state,
            LookupState::Missing {
                policy: Prerequisite::Found { .. },
                group: Prerequisite::Found { .. },
            }
        ));
        let repo = SeaOrmPolicyStore::new();
        assert!(
            repo.find_revision_blob(&db, org_id, "web", "rev-1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_delete_missing_association_halts_without_consulting_the_engine() {
        let db = inmem_db().await;
        let engine = MockEngine::granting();
        let service = build_service(db, engine.clone());
        let requestor = Requestor::new(Uuid::new_v4());

        let err = service
            .delete_named_policy(&requestor, Uuid::new_v4(), "web", "prod")
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            DomainError::NotFound { message }
                if message == "Cannot load policy web in policy group prod"
        ));
        assert!(engine.calls().is_empty());
    }

    // =========================================================================
    // Authorization tests
    // =========================================================================

    #[tokio::test]
    async fn test_denied_engine_yields_forbidden_and_writes_nothing() {
        let db = inmem_db().await;
        let service = build_service(db, MockEngine::denying());
        let requestor = Requestor::new(Uuid::new_v4());
        let org_id = Uuid::new_v4();

        let err = service
            .put_named_policy(
                &requestor,
                org_id,
                "web",
                "prod",
                &body(&policy_doc("web", "rev-1")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));

        let lookup = service
            .resolve_association(org_id, "web", "prod")
            .await
            .unwrap();
        assert_eq!(
            lookup.state,
            LookupState::Missing {
                policy: Prerequisite::NotFound,
                group: Prerequisite::NotFound,
            }
        );
    }

    #[tokio::test]
    async fn test_superuser_bypasses_a_denying_engine() {
        let db = inmem_db().await;
        let engine = MockEngine::denying();
        let service = build_service(db, engine.clone());
        let superuser = Requestor::superuser(Uuid::new_v4());
        let org_id = Uuid::new_v4();

        service
            .put_named_policy(
                &superuser,
                org_id,
                "web",
                "prod",
                &body(&policy_doc("web", "rev-1")),
            )
            .await
            .unwrap();

        assert!(engine.calls().is_empty());
        let lookup = service
            .resolve_association(org_id, "web", "prod")
            .await
            .unwrap();
        assert!(matches!(lookup.state, LookupState::Found(_)));
    }

    // =========================================================================
    // Repository tests
    // =========================================================================

    #[tokio::test]
    async fn test_duplicate_policy_creation_is_a_conflict() {
        let db = inmem_db().await;
        let repo = SeaOrmPolicyStore::new();
        let org_id = Uuid::new_v4();

        let row = PolicyRow {
            id: Uuid::new_v4(),
            org_id,
            name: "web".to_owned(),
            authz_id: Uuid::new_v4(),
        };
        repo.create_policy(&db, row).await.unwrap();

        let duplicate = PolicyRow {
            id: Uuid::new_v4(),
            org_id,
            name: "web".to_owned(),
            authz_id: Uuid::new_v4(),
        };
        let err = repo.create_policy(&db, duplicate).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }
}

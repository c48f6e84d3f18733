//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconcile_helpers::*;
    use crate::test_utils::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
        LabelSelector, LabelSelectorRequirement, ObjectMeta, OwnerReference,
    };
    use kube_store::{MockStore, StoreOp};
    use std::collections::BTreeMap;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_overwrite_replaces_present_value() {
        let mut replicas = Some(3);
        MergePolicy::Overwrite.apply(&mut replicas, Some(1));
        assert_eq!(replicas, Some(1));
    }

    #[test]
    fn test_set_if_absent_fills_missing_value() {
        let mut containers: Vec<String> = Vec::new();
        MergePolicy::SetIfAbsent.apply(&mut containers, vec!["nginx".to_string()]);
        assert_eq!(containers, vec!["nginx".to_string()]);
    }

    #[test]
    fn test_set_if_absent_keeps_present_value() {
        let mut labels = data(&[("app", "custom")]);
        MergePolicy::SetIfAbsent.apply(&mut labels, data(&[("app", "nginx")]));
        assert_eq!(labels, data(&[("app", "custom")]));
    }

    #[test]
    fn test_label_selector_absence() {
        assert!(LabelSelector::default().is_absent());
        assert!(
            LabelSelector {
                match_labels: Some(BTreeMap::new()),
                match_expressions: Some(Vec::new()),
            }
            .is_absent()
        );
        let by_expression = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "app".to_string(),
                operator: "Exists".to_string(),
                values: None,
            }]),
        };
        assert!(!by_expression.is_absent());
    }

    #[test]
    fn test_set_controller_reference_is_idempotent() {
        let nginx = create_test_nginx("web", "default", Some(1));
        let mut meta = ObjectMeta::default();

        set_controller_reference(&mut meta, &nginx).unwrap();
        let first = meta.clone();
        set_controller_reference(&mut meta, &nginx).unwrap();

        assert_eq!(meta, first);
        let refs = meta.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "Nginx");
        assert_eq!(refs[0].name, "web");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_set_controller_reference_keeps_non_controller_owners() {
        let nginx = create_test_nginx("web", "default", None);
        let mut meta = ObjectMeta {
            owner_references: Some(vec![OwnerReference {
                api_version: "v1".to_string(),
                kind: "ConfigMap".to_string(),
                name: "settings".to_string(),
                uid: "cm-uid".to_string(),
                controller: None,
                block_owner_deletion: None,
            }]),
            ..Default::default()
        };

        set_controller_reference(&mut meta, &nginx).unwrap();
        assert_eq!(meta.owner_references.unwrap().len(), 2);
    }

    #[test]
    fn test_set_controller_reference_refuses_other_controller() {
        let nginx = create_test_nginx("web", "default", None);
        let other = create_test_nginx("other", "default", None);
        let mut meta = ObjectMeta {
            name: Some("deploy-web".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        };
        set_controller_reference(&mut meta, &other).unwrap();

        let err = set_controller_reference(&mut meta, &nginx).unwrap_err();
        assert!(matches!(err, ControllerError::Invariant(msg) if msg.contains("other")));
    }

    #[test]
    fn test_set_controller_reference_requires_owner_uid() {
        let mut nginx = create_test_nginx("web", "default", None);
        nginx.metadata.uid = None;
        let err = set_controller_reference(&mut ObjectMeta::default(), &nginx).unwrap_err();
        assert!(matches!(err, ControllerError::Invariant(_)));
    }

    #[tokio::test]
    async fn test_create_or_update_creates_then_is_unchanged() {
        let store = MockStore::<ConfigMap>::new();
        let mutate = |cm: &mut ConfigMap| {
            cm.data = Some(data(&[("index.html", "hello")]));
            Ok(())
        };

        let (created, result) = create_or_update::<ConfigMap, _>(&store, "default", "site", mutate).await.unwrap();
        assert_eq!(result, OperationResult::Created);
        assert_eq!(created.metadata.name.as_deref(), Some("site"));
        assert_eq!(created.metadata.namespace.as_deref(), Some("default"));

        let (_, result) = create_or_update::<ConfigMap, _>(&store, "default", "site", mutate).await.unwrap();
        assert_eq!(result, OperationResult::Unchanged);
        assert!(!result.is_write());
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_create_or_update_updates_when_different() {
        let store = MockStore::<ConfigMap>::new();
        store.seed(ConfigMap {
            metadata: ObjectMeta {
                name: Some("site".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(data(&[("index.html", "old")])),
            ..Default::default()
        });

        let (updated, result) = create_or_update::<ConfigMap, _>(&store, "default", "site", |cm: &mut ConfigMap| {
            cm.data = Some(data(&[("index.html", "new")]));
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(result, OperationResult::Updated);
        assert_eq!(updated.data.unwrap().get("index.html").map(String::as_str), Some("new"));
        assert_eq!(store.writes()[0].op, StoreOp::Update);
    }

    #[tokio::test]
    async fn test_create_or_update_rejects_identity_change() {
        let store = MockStore::<ConfigMap>::new();
        let err = create_or_update::<ConfigMap, _>(&store, "default", "site", |cm: &mut ConfigMap| {
            cm.metadata.name = Some("elsewhere".to_string());
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ControllerError::Invariant(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_create_or_update_surfaces_mutation_error() {
        let store = MockStore::<ConfigMap>::new();
        let err = create_or_update::<ConfigMap, _>(&store, "default", "site", |_: &mut ConfigMap| {
            Err(ControllerError::Invariant("refused".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ControllerError::Invariant(msg) if msg == "refused"));
        assert!(store.objects().is_empty());
    }
}

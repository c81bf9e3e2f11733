mod integration_tests {

    use futures::stream::StreamExt;
    use tracing::debug;

    use fluvio_future::test_async;
    use k8_config::StorageConfig;
    use k8_registry::rest::Creater;
    use k8_registry::rest::DefaultUpdatedObjectInfo;
    use k8_registry::rest::Getter;
    use k8_registry::rest::GracefulDeleter;
    use k8_registry::rest::Lister;
    use k8_registry::rest::RequestContext;
    use k8_registry::rest::TableConvertor;
    use k8_registry::rest::TransformUpdatedObjectInfo;
    use k8_registry::rest::Updater;
    use k8_registry::rest::Watcher;
    use k8_registry::Options;
    use k8_registry::RegistryError;
    use k8_registry::RestOptions;
    use k8_registry::StorageFactory;
    use k8_registry::TableInput;
    use k8_servicecatalog::cluster_service_broker::new_storage;
    use k8_servicecatalog::cluster_service_broker::new_storage_with_policy;
    use k8_servicecatalog::cluster_service_broker::BrokerStorage;
    use k8_servicecatalog::cluster_service_broker::StatusSpecPolicy;
    use k8_servicecatalog::cluster_service_broker::FINALIZER_SERVICE_CATALOG;
    use k8_storage::InMemoryStorage;
    use k8_types::options::CreateOptions;
    use k8_types::options::DeleteOptions;
    use k8_types::options::GetOptions;
    use k8_types::options::ListOptions;
    use k8_types::options::PropagationPolicy;
    use k8_types::servicecatalog::ClusterServiceBroker;
    use k8_types::servicecatalog::ClusterServiceBrokerSpec;
    use k8_types::servicecatalog::ConditionStatus;
    use k8_types::servicecatalog::ServiceBrokerCondition;
    use k8_types::servicecatalog::ServiceBrokerConditionType;
    use k8_types::K8Watch;
    use k8_types::Spec;

    fn broker_options() -> Options {
        StorageFactory::new(StorageConfig::default())
            .expect("factory")
            .with_storage(InMemoryStorage::shared())
            .options(&ClusterServiceBrokerSpec::group_resource())
    }

    fn broker_storage() -> BrokerStorage {
        new_storage(&broker_options()).expect("broker storage")
    }

    fn broker(name: &str, url: &str) -> ClusterServiceBroker {
        ClusterServiceBroker::new(name, ClusterServiceBrokerSpec::with_url(url))
    }

    fn ready_condition() -> ServiceBrokerCondition {
        ServiceBrokerCondition::new(
            ServiceBrokerConditionType::Ready,
            ConditionStatus::True,
            "FetchedCatalog",
            "Successfully fetched catalog entries from broker.",
        )
        .with_transition_time("2020-01-01T00:00:00Z")
    }

    async fn create(storage: &BrokerStorage, obj: ClusterServiceBroker) -> ClusterServiceBroker {
        storage
            .brokers
            .create(&RequestContext::new(), obj, None, &CreateOptions::default())
            .await
            .expect("create broker")
    }

    #[test_async]
    async fn test_create_defaults() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let mut input = broker("b1", "https://a");
        input.status.push_condition(ready_condition());

        let created = create(&storage, input).await;
        debug!("created broker: {:#?}", created);
        assert_eq!(created.kind, "ClusterServiceBroker");
        assert_eq!(created.api_version, "servicecatalog.k8s.io/v1beta1");
        assert!(created.status.conditions().is_empty());
        assert_eq!(created.metadata.generation, Some(1));
        assert_eq!(created.metadata.finalizers, vec![FINALIZER_SERVICE_CATALOG]);
        assert!(created.metadata.namespace.is_empty());

        let fetched = storage
            .brokers
            .get(&RequestContext::new(), "b1", &GetOptions::default())
            .await?;
        assert_eq!(fetched, created);
        Ok(())
    }

    #[test_async]
    async fn test_create_invalid() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let err = storage
            .brokers
            .create(
                &RequestContext::new(),
                broker("b1", ""),
                None,
                &CreateOptions::default(),
            )
            .await
            .expect_err("invalid");
        assert!(err.is_invalid());
        assert_eq!(
            err.to_string(),
            "clusterservicebrokers.servicecatalog.k8s.io \"b1\" is invalid: [spec.url: Required value: brokers must have a remote url to contact]"
        );

        create(&storage, broker("b1", "https://a")).await;
        let err = storage
            .brokers
            .create(
                &RequestContext::new(),
                broker("b1", "https://a"),
                None,
                &CreateOptions::default(),
            )
            .await
            .expect_err("exists");
        assert!(err.is_already_exists());
        Ok(())
    }

    #[test_async]
    async fn test_status_update_keeps_spec() -> Result<(), RegistryError> {
        let storage = broker_storage();
        create(&storage, broker("b1", "https://a")).await;

        let set_ready = TransformUpdatedObjectInfo::new(|mut obj: ClusterServiceBroker| {
            obj.spec.common.url = "https://b".to_owned();
            obj.status.push_condition(ready_condition());
            Ok::<_, RegistryError>(obj)
        });
        let (updated, created) = storage
            .status
            .update(&RequestContext::new(), "b1", &set_ready, None, None)
            .await?;
        assert!(!created);
        assert_eq!(updated.spec.url(), "https://a");
        assert_eq!(updated.metadata.generation, Some(1));
        let latest = updated.status.common.latest_condition().expect("condition");
        assert_eq!(latest.type_, ServiceBrokerConditionType::Ready);
        assert_eq!(latest.status, ConditionStatus::True);

        let fetched = storage
            .status
            .get(&RequestContext::new(), "b1", &GetOptions::default())
            .await?;
        assert_eq!(fetched, updated);
        Ok(())
    }

    #[test_async]
    async fn test_status_update_reject_policy() -> Result<(), RegistryError> {
        let storage = new_storage_with_policy(&broker_options(), StatusSpecPolicy::Reject)?;
        create(&storage, broker("b1", "https://a")).await;

        let move_url = TransformUpdatedObjectInfo::new(|mut obj: ClusterServiceBroker| {
            obj.spec.common.url = "https://b".to_owned();
            Ok::<_, RegistryError>(obj)
        });
        let err = storage
            .status
            .update(&RequestContext::new(), "b1", &move_url, None, None)
            .await
            .expect_err("spec change");
        assert!(err.is_invalid());
        Ok(())
    }

    #[test_async]
    async fn test_spec_update() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let created = create(&storage, broker("b1", "https://a")).await;

        let with_status = storage
            .status
            .update(
                &RequestContext::new(),
                "b1",
                &TransformUpdatedObjectInfo::new(|mut obj: ClusterServiceBroker| {
                    obj.status.push_condition(ready_condition());
                    Ok::<_, RegistryError>(obj)
                }),
                None,
                None,
            )
            .await?
            .0;

        let mut changed = with_status.clone();
        changed.spec.common.url = "https://b".to_owned();
        changed.status = Default::default();
        let (updated, _) = storage
            .brokers
            .update(
                &RequestContext::new(),
                "b1",
                &DefaultUpdatedObjectInfo::new(changed),
                None,
                None,
            )
            .await?;
        assert_eq!(updated.spec.url(), "https://b");
        assert_eq!(updated.metadata.generation, Some(2));
        assert_eq!(updated.status, with_status.status);

        // still carries resource version of first write
        let mut stale = created;
        stale.spec.common.url = "https://c".to_owned();
        let err = storage
            .brokers
            .update(
                &RequestContext::new(),
                "b1",
                &DefaultUpdatedObjectInfo::new(stale),
                None,
                None,
            )
            .await
            .expect_err("conflict");
        assert!(err.is_conflict());

        let err = storage
            .brokers
            .update(
                &RequestContext::new(),
                "missing",
                &DefaultUpdatedObjectInfo::new(broker("missing", "https://a")),
                None,
                None,
            )
            .await
            .expect_err("no create on update");
        assert!(err.is_not_found());
        Ok(())
    }

    #[test_async]
    async fn test_delete_with_garbage_collection() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let owner = create(&storage, broker("owner", "https://a")).await;
        for name in ["dependent-1", "dependent-2"] {
            let mut dependent = broker(name, "https://a");
            dependent
                .metadata
                .owner_references
                .push(owner.metadata.make_owner_reference::<ClusterServiceBrokerSpec>());
            create(&storage, dependent).await;
        }
        create(&storage, broker("unrelated", "https://a")).await;

        let (deleted, _) = storage
            .brokers
            .delete(&RequestContext::new(), "owner", &DeleteOptions::default())
            .await?;
        assert_eq!(deleted.metadata.name, "owner");

        let left = storage
            .brokers
            .list(&RequestContext::new(), &ListOptions::default())
            .await?;
        let names: Vec<&str> = left
            .items
            .iter()
            .map(|broker| broker.metadata.name.as_str())
            .collect();
        assert_eq!(names, vec!["unrelated"]);
        Ok(())
    }

    #[test_async]
    async fn test_delete_orphan() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let owner = create(&storage, broker("owner", "https://a")).await;
        let mut dependent = broker("dependent", "https://a");
        dependent
            .metadata
            .owner_references
            .push(owner.metadata.make_owner_reference::<ClusterServiceBrokerSpec>());
        create(&storage, dependent).await;

        storage
            .brokers
            .delete(
                &RequestContext::new(),
                "owner",
                &DeleteOptions::with_policy(PropagationPolicy::Orphan),
            )
            .await?;
        let orphan = storage
            .brokers
            .get(&RequestContext::new(), "dependent", &GetOptions::default())
            .await?;
        assert!(orphan.metadata.owner_references.is_empty());

        let err = storage
            .brokers
            .get(&RequestContext::new(), "owner", &GetOptions::default())
            .await
            .expect_err("deleted");
        assert!(err.is_not_found());
        Ok(())
    }

    #[test_async]
    async fn test_list_selectors_and_table() -> Result<(), RegistryError> {
        let storage = broker_storage();
        for (name, env) in [("b1", "prod"), ("b2", "prod"), ("b3", "dev")] {
            let mut obj = broker(name, &format!("https://{}.example.com", name));
            obj.metadata.labels.insert("env".to_owned(), env.to_owned());
            create(&storage, obj).await;
        }

        let prod = storage
            .brokers
            .list(
                &RequestContext::new(),
                &ListOptions {
                    label_selector: Some("env=prod".to_owned()),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(prod.items.len(), 2);

        let from_namespace = storage
            .brokers
            .list(
                &RequestContext::with_namespace("team-a"),
                &ListOptions::default(),
            )
            .await?;
        assert_eq!(from_namespace.items.len(), 3);

        let single = storage
            .brokers
            .list(
                &RequestContext::new(),
                &ListOptions {
                    label_selector: Some("env=prod".to_owned()),
                    field_selector: Some("metadata.name=b2".to_owned()),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(single.items.len(), 1);
        assert_eq!(single.items[0].metadata.name, "b2");

        let none = storage
            .brokers
            .list(
                &RequestContext::new(),
                &ListOptions {
                    field_selector: Some("metadata.namespace=default".to_owned()),
                    ..Default::default()
                },
            )
            .await?;
        assert!(none.is_empty());

        let table = storage
            .brokers
            .convert_to_table(&RequestContext::new(), TableInput::List(&prod))?;
        let rows = table.string_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "b1");
        assert_eq!(rows[0][1], "https://b1.example.com");
        assert_eq!(rows[0][2], "");
        assert_ne!(rows[0][3], "<unknown>");
        Ok(())
    }

    #[test_async]
    async fn test_watch_status_changes() -> Result<(), RegistryError> {
        let storage = broker_storage();
        let mut events = storage.brokers.watch(
            &RequestContext::new(),
            &ListOptions {
                field_selector: Some("metadata.name=b1".to_owned()),
                ..Default::default()
            },
        )?;

        create(&storage, broker("b2", "https://b")).await;
        create(&storage, broker("b1", "https://a")).await;
        storage
            .status
            .update(
                &RequestContext::new(),
                "b1",
                &TransformUpdatedObjectInfo::new(|mut obj: ClusterServiceBroker| {
                    obj.status.push_condition(ready_condition());
                    Ok::<_, RegistryError>(obj)
                }),
                None,
                None,
            )
            .await?;

        match events.next().await.expect("added")? {
            K8Watch::ADDED(obj) => assert_eq!(obj.metadata.name, "b1"),
            other => panic!("unexpected event {:?}", other),
        }
        match events.next().await.expect("modified")? {
            K8Watch::MODIFIED(obj) => assert_eq!(obj.status.conditions().len(), 1),
            other => panic!("unexpected event {:?}", other),
        }

        storage.brokers.destroy();
        assert!(events.next().await.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_prefix_fails() {
        let options = Options::new(RestOptions {
            storage: Some(InMemoryStorage::shared()),
            ..Default::default()
        });
        let err = new_storage(&options).expect_err("prefix");
        assert!(matches!(err, RegistryError::Config(_)));
    }
}

/// Connection bootstrap tests
///
/// Discovery, node filters, the balancer registry and the Router facade.
/// Run with: cargo test --test connection_tests
use shard_router::{
    BalancerRegistry, BalancerRole, Discovery, InMemoryRouteStore, Node, PickSource,
    RequestMetadata, RoutedConnection, Router, RouterConfig, RouterError, StaticDiscovery,
};
use std::sync::Arc;

fn mixed_nodes() -> Vec<Node> {
    vec![
        Node::new("us-1", 1.0).with_color("us"),
        Node::new("eu-1", 1.0).with_color("eu"),
        Node::new("us-2", 1.0).with_color("us"),
        Node::new("eu-2", 1.0).with_color("eu"),
    ]
}

async fn router(color: &str) -> Router {
    let router = Router::open(RouterConfig::new("player").color(color))
        .await
        .unwrap();
    router
        .discovery()
        .set_nodes("game", mixed_nodes())
        .await
        .unwrap();
    router
}

#[tokio::test]
async fn test_select_only_returns_nodes_of_the_request_color() {
    let router = router("us").await;
    let conn = router.connect("game", BalancerRole::Master).unwrap();

    for oid in 0..20 {
        let md = RequestMetadata::new().with_oid(oid).with_color("eu");
        let node = conn.select(&md).await.unwrap();
        assert_eq!(node.color(), Some("eu"));
        assert_eq!(
            router.route_table().load("eu", oid).await.unwrap(),
            node.address()
        );
    }
}

#[tokio::test]
async fn test_select_falls_back_to_process_color() {
    let router = router("us").await;
    let conn = router.connect("game", BalancerRole::Master).unwrap();

    let pick = conn
        .select_detailed(&RequestMetadata::new().with_oid(1))
        .await
        .unwrap();
    assert_eq!(pick.color, "us");
    assert_eq!(pick.node.color(), Some("us"));
}

#[tokio::test]
async fn test_color_without_nodes_is_no_available() {
    let router = router("us").await;
    let conn = router.connect("game", BalancerRole::Master).unwrap();

    let md = RequestMetadata::new().with_oid(1).with_color("ap");
    assert!(matches!(
        conn.select(&md).await,
        Err(RouterError::NoAvailable)
    ));
}

#[tokio::test]
async fn test_unknown_service_is_a_discovery_error() {
    let router = router("us").await;
    let conn = router.connect("chat", BalancerRole::Reader).unwrap();

    assert!(matches!(
        conn.select(&RequestMetadata::new().with_oid(1)).await,
        Err(RouterError::DiscoveryError(_))
    ));
}

#[tokio::test]
async fn test_extra_filters_run_after_color() {
    let router = router("us").await;
    let only_second = |_: &RequestMetadata, nodes: Vec<Node>| -> Vec<Node> {
        nodes
            .into_iter()
            .filter(|n| n.address().ends_with("-2"))
            .collect()
    };
    let conn = router
        .connect("game", BalancerRole::Master)
        .unwrap()
        .with_filter(Arc::new(only_second));

    for oid in 0..5 {
        let node = conn
            .select(&RequestMetadata::new().with_oid(oid))
            .await
            .unwrap();
        assert_eq!(node.address(), "us-2");
    }
}

#[tokio::test]
async fn test_master_and_reader_share_routes() {
    let router = router("us").await;
    let master = router.connect("game", BalancerRole::Master).unwrap();
    let reader = router.connect("game", BalancerRole::Reader).unwrap();
    let md = RequestMetadata::new().with_oid(77);

    let owner = master.select(&md).await.unwrap();
    let seen = reader.select_detailed(&md).await.unwrap();
    assert_eq!(seen.node, owner);
    assert_eq!(seen.source, PickSource::Sticky);
}

#[tokio::test]
async fn test_departed_owner_can_be_released_and_reassigned() {
    let router = router("us").await;
    let conn = router.connect("game", BalancerRole::Master).unwrap();
    let md = RequestMetadata::new().with_oid(5);

    let owner = conn.select(&md).await.unwrap();
    assert_eq!(owner.address(), "us-1");

    // us-1 leaves discovery while still owning the route.
    router
        .discovery()
        .set_nodes(
            "game",
            mixed_nodes()
                .into_iter()
                .filter(|n| n.address() != "us-1")
                .collect(),
        )
        .await
        .unwrap();
    assert!(matches!(
        conn.select(&md).await,
        Err(RouterError::InconsistentRoute { .. })
    ));

    // Whoever noticed releases it only if nobody reassigned it meanwhile.
    router
        .route_table()
        .del_if_same("us", 5, owner.address())
        .await
        .unwrap();
    let next = conn.select(&md).await.unwrap();
    assert_eq!(next.address(), "us-2");
}

#[tokio::test]
async fn test_registry_hands_out_one_balancer_per_service_and_role() {
    let config = RouterConfig::new("player").color("us");
    let registry =
        BalancerRegistry::from_config(&config, Arc::new(InMemoryRouteStore::new())).unwrap();
    assert!(!registry.is_registered("game", BalancerRole::Master).unwrap());

    let a = registry.get_or_register("game", BalancerRole::Master).unwrap();
    let b = registry.get_or_register("game", BalancerRole::Master).unwrap();
    let c = registry.get_or_register("chat", BalancerRole::Reader).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.role(), BalancerRole::Reader);

    assert!(registry.is_registered("game", BalancerRole::Master).unwrap());
    assert!(!registry.is_registered("game", BalancerRole::Reader).unwrap());
    assert_eq!(
        registry.registered().unwrap(),
        vec![
            ("chat".to_string(), BalancerRole::Reader),
            ("game".to_string(), BalancerRole::Master),
        ]
    );
}

#[tokio::test]
async fn test_connections_built_by_hand_share_registry_state() {
    let config = RouterConfig::new("player").color("us");
    let registry =
        BalancerRegistry::from_config(&config, Arc::new(InMemoryRouteStore::new())).unwrap();
    let discovery = StaticDiscovery::new();
    discovery.set_nodes("game", mixed_nodes()).await.unwrap();

    let first = RoutedConnection::new(
        "game",
        BalancerRole::Master,
        &registry,
        Arc::new(discovery.clone()),
    )
    .unwrap();
    let second =
        RoutedConnection::new("game", BalancerRole::Master, &registry, Arc::new(discovery))
            .unwrap();

    // Shared counters: the second connection continues the rotation.
    let a = first.select(&RequestMetadata::new().with_oid(1)).await.unwrap();
    let b = second.select(&RequestMetadata::new().with_oid(2)).await.unwrap();
    assert_eq!(a.address(), "us-1");
    assert_eq!(b.address(), "us-2");
}

#[tokio::test]
async fn test_static_discovery_validates_nodes() {
    let discovery = StaticDiscovery::new();
    assert!(discovery
        .set_nodes("game", vec![Node::new("a", -1.0)])
        .await
        .is_err());
    assert!(discovery.set_nodes("", vec![]).await.is_err());

    discovery
        .set_nodes("game", vec![Node::new("a", 1.0)])
        .await
        .unwrap();
    assert_eq!(discovery.nodes("game").await.unwrap().len(), 1);
    assert!(discovery.remove_service("game").await.is_some());
    assert!(discovery.nodes("game").await.is_err());
}

#[tokio::test]
async fn test_router_refuses_out_of_range_durations() {
    let config = RouterConfig::new("player")
        .color("us")
        .route_ttl(std::time::Duration::from_secs(u64::MAX));
    assert!(matches!(
        Router::open(config).await,
        Err(RouterError::ConfigError(_))
    ));

    assert!(RouterConfig::from_url("shardroute://player@us?ttl=18446744073709551615").is_err());
}

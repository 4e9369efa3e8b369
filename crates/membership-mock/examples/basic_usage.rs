use std::sync::Arc;

use bytes::Bytes;
use flock_membership::{Member, MemberId, MembershipProperties, MembershipService, config};
use flock_membership_mock::MockMemberProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create test peers
    let peer1 = Member::new(
        "node1.example.com",
        4000,
        MemberId::from_hostname("node1.example.com", None),
    );
    let peer2 = Member::new(
        "node2.example.com",
        4000,
        MemberId::from_hostname("node2.example.com", None),
    );

    // Create mock provider
    let provider = Arc::new(MockMemberProvider::new(vec![peer1, peer2]));

    // Configure and start the service
    let mut properties = MembershipProperties::new();
    properties.set(config::TCP_LISTEN_HOST, "127.0.0.1");
    properties.set(config::TCP_LISTEN_PORT, "4000");
    properties.set(config::TCP_SECURE_PORT, "4443");
    properties.set(config::UDP_LISTEN_PORT, "4001");

    let service = MembershipService::with_properties(provider, properties);
    service.set_payload(Bytes::from_static(b"weight=1")).await;
    service.start().await?;

    // The first reconciliation pass runs before start() returns
    println!("Members:");
    for member in service.members().await {
        println!("  - {} at {}", member.id, member.name());
    }

    if let Some(local) = service.local_member(true).await {
        println!(
            "\nLocal member: {} (alive for {:?})",
            local,
            local.alive_time
        );
    }

    service.stop().await?;

    Ok(())
}

//! Assembly of the locally-operated masternode's own broadcast.
//!
//! The result is handed back for manual relay so the operator can inspect
//! it before it propagates.

use crate::constants::chain::PING_BLOCK_CONFIRMATIONS;
use crate::context::CoreContext;
use crate::error::{RejectReason, Rejection};
use crate::message::{keys_from_secret, BroadcastRecord, PingRecord};
use crate::types::{is_valid_net_addr, NetworkType, PayoutAddress};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use tracing::{debug, warn};

/// Build, sign and return our own broadcast. `service` is the advertised
/// endpoint, `secret` the operator key seed, `payee` the payout address.
pub fn build_self_broadcast(
    ctx: &CoreContext,
    service: &str,
    secret: &str,
    payee: &str,
) -> Result<BroadcastRecord, Rejection> {
    if ctx.shutdown.is_cancelled() {
        return Err(RejectReason::ShuttingDown.into());
    }

    // need correct blocks to send a ping
    if ctx.chain.is_importing() {
        return Err(RejectReason::ChainBusy.into());
    }
    if !ctx.sync.is_blockchain_synced() {
        warn!("self-broadcast: sync in progress, must wait until sync is complete");
        return Err(RejectReason::SyncInProgress.into());
    }

    let (signing_key, pub_key) = keys_from_secret(secret).map_err(|_| {
        warn!("self-broadcast: invalid masternode key");
        Rejection::new(RejectReason::KeyFromSecretFailed)
    })?;

    let addr = resolve_service(service, ctx.network)?;

    let mainnet_port = NetworkType::Mainnet.default_p2p_port();
    if ctx.network == NetworkType::Mainnet {
        if addr.port() != mainnet_port {
            warn!(
                "self-broadcast: invalid port {} for masternode {}, only {} is supported on mainnet",
                addr.port(),
                service,
                mainnet_port
            );
            return Err(RejectReason::WrongPort.into());
        }
    } else if addr.port() == mainnet_port {
        warn!(
            "self-broadcast: invalid port {} for masternode {}, {} is only supported on mainnet",
            addr.port(),
            service,
            mainnet_port
        );
        return Err(RejectReason::WrongPort.into());
    }

    debug!(
        "self-broadcast: building for masternode key {}",
        hex::encode(crate::types::key_id(&pub_key))
    );

    if ctx.shutdown.is_cancelled() {
        return Err(RejectReason::ShuttingDown.into());
    }

    // ping the block a stable confirmation horizon behind the tip
    let tip = ctx.chain.height();
    if tip < PING_BLOCK_CONFIRMATIONS {
        return Err(RejectReason::TipTooLow.into());
    }
    let anchor = ctx
        .chain
        .block_at(tip - PING_BLOCK_CONFIRMATIONS)
        .ok_or(Rejection::new(RejectReason::TipTooLow))?;

    let now = ctx.adjusted_time();
    let mut ping = PingRecord::new(pub_key, anchor.hash, now);
    ping.sign(&signing_key, now).map_err(|_| {
        warn!(
            "self-broadcast: failed to sign ping, masternode={}",
            hex::encode(crate::types::key_id(&pub_key))
        );
        Rejection::new(RejectReason::BadSignature)
    })?;

    let mut mnb = BroadcastRecord::new(
        addr,
        pub_key,
        PayoutAddress::parse(payee),
        ctx.protocol_version,
    );

    if !is_valid_net_addr(&mnb.identity.addr, ctx.network) {
        warn!(
            "self-broadcast: invalid IP address, masternode={}",
            hex::encode(crate::types::key_id(&pub_key))
        );
        return Err(RejectReason::InvalidAddr.into());
    }

    mnb.last_ping = Some(ping);

    if ctx.shutdown.is_cancelled() {
        return Err(RejectReason::ShuttingDown.into());
    }

    mnb.sign(&signing_key, ctx.network, now).map_err(|_| {
        warn!(
            "self-broadcast: failed to sign broadcast, masternode={}",
            hex::encode(crate::types::key_id(&pub_key))
        );
        Rejection::new(RejectReason::BadSignature)
    })?;

    Ok(mnb)
}

/// Resolve the operator-supplied service string to an endpoint; a bare
/// address gets the network's default port.
fn resolve_service(service: &str, network: NetworkType) -> Result<SocketAddr, Rejection> {
    if let Ok(addr) = service.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = service.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, network.default_p2p_port()));
    }
    // hostname form, possibly without a port
    let with_port;
    let lookup = if service.contains(':') {
        service
    } else {
        with_port = format!("{}:{}", service, network.default_p2p_port());
        &with_port
    };
    lookup
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| {
            warn!("self-broadcast: invalid address {} for masternode", service);
            Rejection::new(RejectReason::InvalidAddr)
        })
}

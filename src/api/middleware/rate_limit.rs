//! Rate limiting middleware using token bucket algorithm.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

type PeerGovernorLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for the management API.
///
/// # Limits
///
/// - **Rate**: 20 requests per second
/// - **Burst**: 100 requests
///
/// Query endpoints are used interactively from the management UI, so the
/// budget is higher than for typical admin APIs. Requests exceeding the
/// limit receive `429 Too Many Requests`.
///
/// # Key Extraction
///
/// Per client IP, taken from the socket peer address. The router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn layer() -> PeerGovernorLayer {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(50)
            .burst_size(100)
            .finish()
            .expect("rate limit settings are non-zero"),
    );

    GovernorLayer::new(governor_conf)
}

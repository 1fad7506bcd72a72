use mysql::replication::checksum::CHECKSUM_NONE;
use tracing::{debug, info};

use crate::catalog::ChecksumConfig;
use crate::error::{ErrorKind, RelayResult};

/// Stream capabilities negotiated with the source database.
///
/// Computed exactly once per client before streaming starts and threaded,
/// immutable, into every subsequent stream-decoding operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedCapabilities {
    /// Whether replication events carry a trailing checksum.
    pub checksum_enabled: bool,
}

/// Negotiates stream capabilities with the source database.
///
/// Queries the global binlog checksum setting and, when checksums are
/// enabled, aligns the streaming session's expectation with the discovered
/// value so the decoder knows to strip the trailing checksum from every
/// event.
///
/// Servers that predate the checksum setting surface
/// [`ErrorKind::UnknownSystemVariable`], which is an expected condition and
/// maps to checksums being disabled. Every other failure, including a failed
/// alignment command, is fatal: streaming with a guessed capability would
/// misparse every event.
pub async fn negotiate_capabilities<C>(control: &C) -> RelayResult<NegotiatedCapabilities>
where
    C: ChecksumConfig,
{
    let value = match control.query_checksum_setting().await {
        Ok(value) => value,
        Err(err) if err.kind() == ErrorKind::UnknownSystemVariable => {
            // Older servers never checksum their events.
            info!("source does not expose a binlog checksum setting, checksums disabled");

            return Ok(NegotiatedCapabilities {
                checksum_enabled: false,
            });
        }
        Err(err) => return Err(err),
    };

    debug!("source reports binlog checksum setting '{}'", value);

    if value == CHECKSUM_NONE {
        return Ok(NegotiatedCapabilities {
            checksum_enabled: false,
        });
    }

    control.apply_checksum_setting(&value).await?;

    info!("streaming session aligned to checksum setting '{}'", value);

    Ok(NegotiatedCapabilities {
        checksum_enabled: true,
    })
}

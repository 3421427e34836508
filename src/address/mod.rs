//! Address derivation and validation
//!
//! One [`AddressService`] per chain family, looked up through the
//! [`AddressRegistry`]. Services are stateless apart from network
//! parameters and safe to share across threads.

pub mod algorand;
pub mod bitcoin;
pub mod ethereum;
pub mod registry;
pub mod tezos;
pub mod xrp;

pub use self::bitcoin::{UtxoDestination, UtxoNetwork};
pub use algorand::AlgorandAddressService;
pub use ethereum::EthereumAddressService;
pub use registry::AddressRegistry;
pub use tezos::TezosAddressService;
pub use xrp::XrpAddressService;

use crate::error::{EngineError, EngineResult};
use crate::types::{Address, AddressType, Chain, Curve};

/// Derives and validates addresses for one chain
pub trait AddressService: Send + Sync {
    fn chain(&self) -> Chain;

    /// Address styles this service can produce; the first is the default
    fn address_types(&self) -> &[AddressType] {
        &[AddressType::Default]
    }

    fn make_address(&self, public_key: &[u8], curve: Curve) -> EngineResult<Address> {
        self.make_address_typed(public_key, curve, AddressType::Default)
    }

    fn make_address_typed(
        &self,
        public_key: &[u8],
        curve: Curve,
        address_type: AddressType,
    ) -> EngineResult<Address>;

    fn validate(&self, address: &str) -> bool;
}

/// Reject curves the chain cannot derive addresses for
pub(crate) fn ensure_curve(chain: Chain, curve: Curve) -> EngineResult<()> {
    if chain.supported_curves().contains(&curve) {
        Ok(())
    } else {
        Err(EngineError::unsupported_curve(chain, curve))
    }
}

/// Reject address styles the service does not offer
pub(crate) fn ensure_type(
    service: &dyn AddressService,
    address_type: AddressType,
) -> EngineResult<()> {
    if service.address_types().contains(&address_type) {
        Ok(())
    } else {
        Err(EngineError::invalid_request(format!(
            "{} has no {:?} address type",
            service.chain(),
            address_type
        )))
    }
}

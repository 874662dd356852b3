use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};

/// The RPC provider type used throughout the application.
///
/// Type-erased so services holding a provider stay nameable.
pub type ChainProvider = DynProvider;

/// Create a provider that signs with the given hex private key.
///
/// Returns the provider together with the signer's address.
pub fn create_signer_provider(
    rpc_url: &str,
    private_key: &str,
) -> eyre::Result<(ChainProvider, Address)> {
    let signer: PrivateKeySigner = private_key.trim().parse()?;
    let address = signer.address();
    let url = rpc_url.parse()?;
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);
    Ok((provider.erased(), address))
}

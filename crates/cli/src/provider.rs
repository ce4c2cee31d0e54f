use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use eyre::WrapErr;

fn parse_signer(private_key: &str) -> eyre::Result<PrivateKeySigner> {
    private_key
        .trim()
        .parse()
        .wrap_err("PRIVATE_KEY is not a valid hex private key")
}

/// Address a private key signs for.
pub fn holder_from_key(private_key: &str) -> eyre::Result<Address> {
    Ok(parse_signer(private_key)?.address())
}

/// Connects a signing provider. The signer's address is the holder the
/// agent reads and trades for.
pub async fn connect(
    rpc_url: &str,
    private_key: &str,
) -> eyre::Result<(impl Provider + Clone + 'static, Address)> {
    let signer = parse_signer(private_key)?;
    let holder = signer.address();

    let provider = ProviderBuilder::new()
        .wallet(signer)
        .connect(rpc_url)
        .await
        .wrap_err_with(|| format!("failed to connect to {rpc_url}"))?;

    Ok((provider, holder))
}

/// Provider without a wallet, for commands that only read.
pub async fn connect_read_only(rpc_url: &str) -> eyre::Result<impl Provider + Clone + 'static> {
    ProviderBuilder::new()
        .connect(rpc_url)
        .await
        .wrap_err_with(|| format!("failed to connect to {rpc_url}"))
}

use crate::Error;
use soroban_sdk::Address;

/// Validates the escrowed asset identifier and returns its canonical form.
///
/// Token operations go through a Soroban token contract, so the asset id must
/// be a contract (`C...`) strkey rather than an account.
pub(crate) fn normalize_asset_id(raw_asset_id: &Address) -> Result<Address, Error> {
    let strkey = raw_asset_id.to_string();
    if strkey.len() != 56 {
        return Err(Error::InvalidAssetId);
    }

    let mut bytes = [0u8; 56];
    strkey.copy_into_slice(&mut bytes);
    if bytes[0] != b'C' {
        return Err(Error::InvalidAssetId);
    }
    Ok(raw_asset_id.clone())
}

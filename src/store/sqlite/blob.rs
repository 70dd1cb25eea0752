// BLOB columns: [version: u8][wincode payload]. Empty blob reads as an empty list.

use crate::models::FactorResult;

pub(super) const BLOB_VERSION: u8 = 1;

pub(super) fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

pub(super) fn blob_version(bytes: &[u8]) -> u8 {
    if bytes.is_empty() { 0 } else { bytes[0] }
}

fn blob_payload(bytes: &[u8]) -> anyhow::Result<Option<&[u8]>> {
    match blob_version(bytes) {
        0 if bytes.is_empty() => Ok(None),
        BLOB_VERSION => Ok(Some(&bytes[1..])),
        v => anyhow::bail!("unsupported blob version {}", v),
    }
}

pub(super) fn encode_ports(ports: &Vec<u16>) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(ports).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(BLOB_VERSION, payload))
}

pub(super) fn decode_ports(bytes: &[u8]) -> anyhow::Result<Vec<u16>> {
    let Some(payload) = blob_payload(bytes)? else {
        return Ok(Vec::new());
    };
    wincode::deserialize(payload).map_err(|e| anyhow::anyhow!("wincode deserialize ports: {}", e))
}

pub(super) fn encode_ids(ids: &Vec<String>) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(ids).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(BLOB_VERSION, payload))
}

pub(super) fn decode_ids(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    let Some(payload) = blob_payload(bytes)? else {
        return Ok(Vec::new());
    };
    wincode::deserialize(payload).map_err(|e| anyhow::anyhow!("wincode deserialize ids: {}", e))
}

pub(super) fn encode_factors(factors: &Vec<FactorResult>) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(factors).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(BLOB_VERSION, payload))
}

pub(super) fn decode_factors(bytes: &[u8]) -> anyhow::Result<Vec<FactorResult>> {
    let Some(payload) = blob_payload(bytes)? else {
        return Ok(Vec::new());
    };
    wincode::deserialize(payload)
        .map_err(|e| anyhow::anyhow!("wincode deserialize factors: {}", e))
}

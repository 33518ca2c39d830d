//! Scanned / pasted payment data (bare addresses and BIP21 URIs)

use crate::address::is_valid_address;
use crate::amount::btc_to_satoshis;
use crate::{Error, Result};
use percent_encoding::percent_decode_str;
use satsend_params::Network;

/// Result of interpreting scanned or pasted data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Destination address
    pub address: String,
    /// Requested amount in satoshis, if the URI carried a valid one
    pub amount: Option<u64>,
    /// Optional label from the URI
    pub label: Option<String>,
}

/// Interpret scan data as a bare address or a `bitcoin:` URI
pub fn parse_scan(network: &Network, data: &str) -> Result<ScanResult> {
    let mut data = data.trim().to_string();

    // Repair poorly formed URIs such as `bitcoin://1abc...`
    let malformed = format!("{}://", network.uri_scheme);
    if data.len() > malformed.len() && starts_with_ignore_case(&data, &malformed) {
        data = format!("{}:{}", network.uri_scheme, &data[malformed.len()..]);
    }

    if is_valid_address(network, &data) {
        return Ok(ScanResult {
            address: data,
            amount: None,
            label: None,
        });
    }

    let scheme = format!("{}:", network.uri_scheme);
    if !starts_with_ignore_case(&data, &scheme) {
        return Err(Error::InvalidUri(data));
    }

    let rest = &data[scheme.len()..];
    let (address, query) = match rest.split_once('?') {
        Some((address, query)) => (address, Some(query)),
        None => (rest, None),
    };

    if !is_valid_address(network, address) {
        return Err(Error::InvalidAddress(address.to_string()));
    }

    let mut amount = None;
    let mut label = None;
    for pair in query.unwrap_or_default().split('&') {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => continue,
        };
        match key.to_ascii_lowercase().as_str() {
            "amount" => match btc_to_satoshis(value) {
                Ok(sats) => amount = Some(sats),
                Err(e) => tracing::debug!("Ignoring URI amount {:?}: {}", value, e),
            },
            "label" => label = Some(decode_label(value)),
            _ => {}
        }
    }

    Ok(ScanResult {
        address: address.to_string(),
        amount,
        label,
    })
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn decode_label(value: &str) -> String {
    let value = value.replace('+', " ");
    percent_decode_str(&value).decode_utf8_lossy().into_owned()
}

//! Deep links to the mobile wallet and the markers it returns with
//!
//! Outbound: the connect link carries `app_url` and `redirect_link`; the sign
//! link carries the encoded transaction as its last path segment plus a
//! `redirect_link`. Inbound: the wallet navigates back to `redirect_link`,
//! which already holds our success marker, optionally adding its own
//! `public_key`, `signature` or `errorCode`/`errorMessage` parameters.

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use tracing::warn;
use url::Url;

use crate::config::DeepLinkConfig;
use crate::errors::WalletFlowResult;

/// What the current page URL says about a completed round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnMarker {
    /// Ordinary page load
    None,
    /// Back from a connect round trip
    Connected { public_key: Option<Pubkey> },
    /// Back from a signing round trip
    TransactionReturned {
        public_key: Option<Pubkey>,
        signature: Option<Signature>,
    },
    /// The wallet reported an error or the user declined
    Rejected { code: Option<String>, message: String },
}

const PARAM_APP_URL: &str = "app_url";
const PARAM_REDIRECT_LINK: &str = "redirect_link";
const PARAM_PUBLIC_KEY: &str = "public_key";
const PARAM_SIGNATURE: &str = "signature";
const PARAM_ERROR_CODE: &str = "errorCode";
const PARAM_ERROR_MESSAGE: &str = "errorMessage";

/// Page URL with query string and fragment removed
pub fn page_base(page: &Url) -> Url {
    let mut base = page.clone();
    base.set_query(None);
    base.set_fragment(None);
    base
}

fn with_marker(page: &Url, marker: &str) -> Url {
    let mut url = page_base(page);
    url.query_pairs_mut().append_pair(marker, "true");
    url
}

/// `connect_base?app_url=<page>&redirect_link=<page>?<connected_marker>=true`
pub fn connect_link(config: &DeepLinkConfig, page: &Url) -> WalletFlowResult<Url> {
    let mut link = Url::parse(&config.connect_base)?;
    link.query_pairs_mut()
        .append_pair(PARAM_APP_URL, page_base(page).as_str())
        .append_pair(
            PARAM_REDIRECT_LINK,
            with_marker(page, &config.connected_marker).as_str(),
        );
    Ok(link)
}

/// `sign_base/<payload>?redirect_link=<page>?<tx_success_marker>=true`
pub fn sign_link(config: &DeepLinkConfig, page: &Url, payload: &str) -> WalletFlowResult<Url> {
    let base = config.sign_base.trim_end_matches('/');
    let mut link = Url::parse(&format!("{}/{}", base, payload))?;
    link.query_pairs_mut().append_pair(
        PARAM_REDIRECT_LINK,
        with_marker(page, &config.tx_success_marker).as_str(),
    );
    Ok(link)
}

/// Read the return markers off a freshly loaded page URL
pub fn parse_return(config: &DeepLinkConfig, page: &Url) -> ReturnMarker {
    let mut connected = false;
    let mut tx_success = false;
    let mut public_key = None;
    let mut signature = None;
    let mut error_code = None;
    let mut error_message = None;

    for (key, value) in page.query_pairs() {
        match key.as_ref() {
            k if k == config.connected_marker => connected = value == "true",
            k if k == config.tx_success_marker => tx_success = value == "true",
            PARAM_PUBLIC_KEY => match Pubkey::from_str(&value) {
                Ok(pk) => public_key = Some(pk),
                Err(_) => warn!(value = %value, "Ignoring malformed public_key on return url"),
            },
            PARAM_SIGNATURE => match Signature::from_str(&value) {
                Ok(sig) => signature = Some(sig),
                Err(_) => warn!(value = %value, "Ignoring malformed signature on return url"),
            },
            PARAM_ERROR_CODE => error_code = Some(value.into_owned()),
            PARAM_ERROR_MESSAGE => error_message = Some(value.into_owned()),
            _ => {}
        }
    }

    if error_code.is_some() || error_message.is_some() {
        return ReturnMarker::Rejected {
            code: error_code,
            message: error_message.unwrap_or_else(|| "Request declined in wallet".to_string()),
        };
    }
    if tx_success {
        return ReturnMarker::TransactionReturned {
            public_key,
            signature,
        };
    }
    if connected {
        return ReturnMarker::Connected { public_key };
    }
    ReturnMarker::None
}

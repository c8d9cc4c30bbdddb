// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Callback payloads
//!
//! Signed requests are returned to the requesting application as a JSON object
//! POSTed to the request callback URL, callback URLs may also embed payload
//! fields as `{{key}}` templates.

use serde::{Deserialize, Serialize};

/// Callback payload with signing request wire keys
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// Signature
    pub sig: String,
    /// Packed transaction (hex)
    pub tx: String,
    /// Signer actor
    pub sa: String,
    /// Signer permission
    pub sp: String,
    /// Reference block number
    pub rbn: String,
    /// Reference block prefix
    pub rid: String,
    /// Callback expiration
    pub ex: String,
    /// Request URI as received
    pub req: String,
    /// Chain id
    pub cid: String,
    /// Block number, where the transaction was broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,
}

impl CallbackPayload {
    /// Fetch a payload field by wire key
    pub fn get(&self, key: &str) -> Option<&str> {
        let v = match key {
            "sig" => &self.sig,
            "tx" => &self.tx,
            "sa" => &self.sa,
            "sp" => &self.sp,
            "rbn" => &self.rbn,
            "rid" => &self.rid,
            "ex" => &self.ex,
            "req" => &self.req,
            "cid" => &self.cid,
            "bn" => return self.bn.as_deref(),
            _ => return None,
        };
        Some(v.as_str())
    }

    /// Expand `{{key}}` templates in a callback URL, unknown keys are left in place
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);

            let tail = &rest[start + 2..];
            match tail.find("}}") {
                Some(end) => {
                    let key = &tail[..end];
                    match self.get(key) {
                        Some(v) => out.push_str(v),
                        None => {
                            out.push_str("{{");
                            out.push_str(key);
                            out.push_str("}}");
                        }
                    }
                    rest = &tail[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

//! Human-readable descriptions of a proposal's calls

use log::warn;
use serde::Serialize;

use crate::error::{DecodeError, Diagnostic};
use crate::proposal::{Address, ProposalSnapshot};
use crate::units::format_units;

/// Turns controller generic-call payloads into readable text.
pub trait CallDecoder: Sync {
    fn decode_controller_call(&self, call_data: &str) -> Result<String, DecodeError>;
}

/// Decoder for deployments without controller ABI support: every call is
/// described generically.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDecoder;

impl CallDecoder for NoDecoder {
    fn decode_controller_call(&self, call_data: &str) -> Result<String, DecodeError> {
        let selector: String = call_data.chars().take(10).collect();
        Err(DecodeError::UnknownSelector(selector))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDescription {
    pub to: Address,
    pub text: String,
    /// True when the text came from the controller decoder
    pub decoded: bool,
}

pub fn generic_description(to: &Address, call_data: &str, value: &str) -> String {
    format!(
        "Call to {} with data of {} using value of {}",
        to, call_data, value
    )
}

/// Describe every `(to, call_data, value)` triple of `snapshot`.
///
/// Calls to `controller` go through `decoder`; decoder failures fall back
/// to the generic text and are pushed to `diagnostics`. With no controller
/// every call gets the generic text.
pub fn describe_calls(
    snapshot: &ProposalSnapshot,
    controller: Option<&Address>,
    decoder: &dyn CallDecoder,
    decimals: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<CallDescription> {
    snapshot
        .to
        .iter()
        .zip(&snapshot.call_data)
        .zip(&snapshot.values)
        .enumerate()
        .map(|(index, ((to, call_data), value))| {
            let generic = || generic_description(to, call_data, &format_units(value, decimals));

            if controller != Some(to) {
                return CallDescription {
                    to: to.clone(),
                    text: generic(),
                    decoded: false,
                };
            }

            match decoder.decode_controller_call(call_data) {
                Ok(text) => CallDescription {
                    to: to.clone(),
                    text,
                    decoded: true,
                },
                Err(err) => {
                    warn!(
                        "proposal {}: could not decode call #{}: {}",
                        snapshot.id, index, err
                    );
                    diagnostics.push(Diagnostic::DecodeFailure {
                        call_index: index,
                        reason: err.to_string(),
                    });
                    CallDescription {
                        to: to.clone(),
                        text: generic(),
                        decoded: false,
                    }
                }
            }
        })
        .collect()
}

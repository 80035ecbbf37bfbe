//! Call data decoding for transaction logs

use crate::core::DeployedContract;

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCall {
    pub function_name: String,
    /// Comma separated argument values
    pub params: String,
}

/// Decode `input` against the contract's ABI
///
/// `None` when the selector is unknown or the input is not hex.
pub fn decode_call(contract: &DeployedContract, input: &str) -> Option<DecodedCall> {
    let data = hex::decode(input.trim_start_matches("0x")).ok()?;
    if data.len() < 4 {
        return None;
    }

    let selector = hex::encode(&data[..4]);
    let function = contract.function_for_selector(&selector)?;
    let args = &data[4..];

    let params: Vec<String> = function
        .inputs
        .iter()
        .enumerate()
        .map(|(index, param)| decode_param(&param.kind, args, index * WORD).unwrap_or_else(|| "?".to_string()))
        .collect();

    Some(DecodedCall {
        function_name: function.name.clone(),
        params: params.join(", "),
    })
}

fn word(data: &[u8], offset: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(WORD)?)
}

fn low_u128(word: &[u8]) -> Option<u128> {
    let bytes: [u8; 16] = word.get(16..WORD)?.try_into().ok()?;
    Some(u128::from_be_bytes(bytes))
}

fn decode_param(kind: &str, data: &[u8], offset: usize) -> Option<String> {
    let head = word(data, offset)?;

    if kind.ends_with(']') {
        return Some(format!("0x{}", hex::encode(head)));
    }

    match kind {
        "address" => Some(format!("0x{}", hex::encode(&head[12..]))),
        "bool" => Some((head[WORD - 1] != 0).to_string()),
        "string" | "bytes" => {
            let start = usize::try_from(low_u128(head)?).ok()?;
            let len = usize::try_from(low_u128(word(data, start)?)?).ok()?;
            let body_start = start.checked_add(WORD)?;
            let body = data.get(body_start..body_start.checked_add(len)?)?;
            if kind == "string" {
                Some(String::from_utf8_lossy(body).to_string())
            } else {
                Some(format!("0x{}", hex::encode(body)))
            }
        }
        k if k.starts_with("uint") => Some(unsigned(head)),
        k if k.starts_with("int") => Some(signed(head)),
        k if k.starts_with("bytes") => {
            let size: usize = k[5..].parse().ok()?;
            Some(format!("0x{}", hex::encode(head.get(..size)?)))
        }
        _ => Some(format!("0x{}", hex::encode(head))),
    }
}

fn unsigned(word: &[u8]) -> String {
    if word[..16].iter().all(|&b| b == 0) {
        if let Some(value) = low_u128(word) {
            return value.to_string();
        }
    }
    format!("0x{}", hex::encode(word))
}

fn signed(word: &[u8]) -> String {
    let negative = word[0] & 0x80 != 0;
    let fill = if negative { 0xff } else { 0x00 };
    let fits = word[..16].iter().all(|&b| b == fill) && (word[16] & 0x80 != 0) == negative;
    if fits {
        if let Ok(bytes) = <[u8; 16]>::try_from(&word[16..WORD]) {
            return i128::from_be_bytes(bytes).to_string();
        }
    }
    format!("0x{}", hex::encode(word))
}

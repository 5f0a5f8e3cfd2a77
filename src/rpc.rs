//! Ethereum JSON-RPC implementation of the ledger facades.
//!
//! Reads go through `eth_call`, writes through `eth_sendTransaction` (the
//! node holds the key; wallet UX is not this crate's concern) and receipt
//! polling through `eth_getTransactionReceipt`. Calldata is assembled from
//! the fixed selector table below; the contract surface of this client does
//! not change at runtime, so there is no ABI file to load.

use crate::{
    error::{
        ReadError,
        WriteError,
    },
    ledger::{
        Address,
        CallArg,
        CallValue,
        LedgerReader,
        LedgerWriter,
        ReadCall,
        Receipt,
        TxId,
        ValueKind,
        WriteCall,
    },
};
use serde::Deserialize;
use serde_json::{
    Value,
    json,
};
use std::{
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::{
        Duration,
        Instant,
    },
};
use tokio::time;
use tracing::warn;

/// Selectors for the lottery and token surface this client consumes: the
/// first four bytes of the Keccak-256 hash of each signature (in the
/// comments). The ERC20 rows match the selectors published for the standard
/// ABI and anchor the table against transcription errors.
fn selector(function: &str) -> Result<[u8; 4], String> {
    let selector: u32 = match function {
        "betPrice" => 0xcfd8_a175,               // betPrice()
        "betFee" => 0x841e_6ce9,                 // betFee()
        "getBetsOpen" => 0x4cd4_56b0,            // getBetsOpen()
        "getBetsClosingTime" => 0xbd21_78ce,     // getBetsClosingTime()
        "getNumberOfSlots" => 0x4565_63b0,       // getNumberOfSlots()
        "getPaymentTokenAddress" => 0xdea1_82c1, // getPaymentTokenAddress()
        "getTokenName" => 0x862b_092b,           // getTokenName()
        "getTokenSymbol" => 0xf185_0af8,         // getTokenSymbol()
        "getPrizeOf" => 0x60c6_6fc8,             // getPrizeOf(address)
        "owner" => 0x8da5_cb5b,                  // owner()
        "bet" => 0x1161_0c25,                    // bet()
        "betMany" => 0x729e_91e9,                // betMany(uint256)
        "purchaseTokens" => 0x3290_ce29,         // purchaseTokens()
        "returnTokens" => 0x3ae1_786f,           // returnTokens(uint256)
        "prizeWithdraw" => 0x3cc1_21e6,          // prizeWithdraw(uint256)
        "openBets" => 0x990a_49f5,               // openBets(uint256)
        "closeLottery" => 0x6fd0_9816,           // closeLottery()
        "ownerWithdraw" => 0x33f7_07d1,          // ownerWithdraw(uint256)
        "balanceOf" => 0x70a0_8231,              // balanceOf(address)
        "allowance" => 0xdd62_ed3e,              // allowance(address,address)
        "approve" => 0x095e_a7b3,                // approve(address,uint256)
        other => return Err(format!("unknown contract function: {other}")),
    };
    Ok(selector.to_be_bytes())
}

fn encode_calldata(function: &str, args: &[CallArg]) -> Result<String, String> {
    let mut data = selector(function)?.to_vec();
    for arg in args {
        let mut word = [0u8; 32];
        match arg {
            CallArg::Uint(value) => {
                word[16..].copy_from_slice(&value.to_be_bytes());
            }
            CallArg::Addr(address) => {
                word[12..].copy_from_slice(address.as_bytes());
            }
        }
        data.extend_from_slice(&word);
    }
    Ok(format!("0x{}", hex::encode(data)))
}

fn word_at(bytes: &[u8], index: usize) -> Result<&[u8], ReadError> {
    let start = index * 32;
    bytes.get(start..start + 32).ok_or_else(|| {
        ReadError::Decode(format!(
            "return data too short: wanted word {index}, got {} bytes",
            bytes.len()
        ))
    })
}

fn decode_uint_word(word: &[u8]) -> Result<u128, ReadError> {
    if word[..16].iter().any(|byte| *byte != 0) {
        return Err(ReadError::Decode("uint value exceeds u128".to_string()));
    }
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(raw))
}

fn decode_value(kind: ValueKind, raw: &str) -> Result<CallValue, ReadError> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|err| ReadError::Decode(format!("invalid return hex: {err}")))?;
    match kind {
        ValueKind::Uint => decode_uint_word(word_at(&bytes, 0)?).map(CallValue::Uint),
        ValueKind::Bool => {
            let word = word_at(&bytes, 0)?;
            match decode_uint_word(word)? {
                0 => Ok(CallValue::Bool(false)),
                1 => Ok(CallValue::Bool(true)),
                other => {
                    Err(ReadError::Decode(format!("invalid bool value {other}")))
                }
            }
        }
        ValueKind::Addr => {
            let word = word_at(&bytes, 0)?;
            if word[..12].iter().any(|byte| *byte != 0) {
                return Err(ReadError::Decode(
                    "address padding is not zero".to_string(),
                ));
            }
            let mut raw = [0u8; 20];
            raw.copy_from_slice(&word[12..]);
            Ok(CallValue::Addr(Address::new(raw)))
        }
        ValueKind::Text => decode_text(&bytes).map(CallValue::Text),
    }
}

/// Decodes an ABI dynamic string: offset word, length word, then the bytes.
fn decode_text(bytes: &[u8]) -> Result<String, ReadError> {
    let offset = usize::try_from(decode_uint_word(word_at(bytes, 0)?)?)
        .map_err(|_| ReadError::Decode("string offset out of range".to_string()))?;
    if offset % 32 != 0 {
        return Err(ReadError::Decode(format!(
            "string offset {offset} is not word-aligned"
        )));
    }
    let length = usize::try_from(decode_uint_word(word_at(bytes, offset / 32)?)?)
        .map_err(|_| ReadError::Decode("string length out of range".to_string()))?;
    let start = offset + 32;
    let text = bytes.get(start..start + length).ok_or_else(|| {
        ReadError::Decode(format!(
            "string data truncated: wanted {length} bytes at {start}"
        ))
    })?;
    String::from_utf8(text.to_vec())
        .map_err(|_| ReadError::Decode("string is not valid utf-8".to_string()))
}

fn parse_hex_u64(raw: &str) -> Result<u64, String> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|err| format!("invalid hex quantity {raw:?}: {err}"))
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client acting as the configured account.
pub struct EthRpcClient {
    http: reqwest::Client,
    url: String,
    from: Address,
    next_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(url: impl Into<String>, from: Address) -> Result<Self, ReadError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ReadError::Rpc(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            url: url.into(),
            from,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| format!("{method} request failed: {err}"))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| format!("{method} response read failed: {err}"))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(format!("node responded with {status} to {method}: {body}"));
        }
        let parsed: RpcResponse = serde_json::from_slice(&bytes)
            .map_err(|err| format!("invalid {method} response payload: {err}"))?;
        if let Some(error) = parsed.error {
            return Err(format!("{} (code {})", error.message, error.code));
        }
        parsed
            .result
            .ok_or_else(|| format!("{method} response carried neither result nor error"))
    }
}

impl LedgerReader for EthRpcClient {
    async fn read(
        &self,
        target: Address,
        call: ReadCall,
    ) -> Result<CallValue, ReadError> {
        let data = encode_calldata(call.function, &call.args).map_err(ReadError::Decode)?;
        let params = json!([
            {
                "from": self.from.to_string(),
                "to": target.to_string(),
                "data": data,
            },
            "latest",
        ]);
        let result = self
            .request("eth_call", params)
            .await
            .map_err(ReadError::Rpc)?;
        let raw = result.as_str().ok_or_else(|| {
            ReadError::Decode("eth_call result is not a string".to_string())
        })?;
        decode_value(call.ret, raw)
    }

    async fn block_timestamp(&self) -> Result<u64, ReadError> {
        let result = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await
            .map_err(ReadError::Rpc)?;
        let raw = result
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ReadError::Decode("latest block carries no timestamp".to_string())
            })?;
        parse_hex_u64(raw).map_err(ReadError::Decode)
    }
}

impl LedgerWriter for EthRpcClient {
    async fn submit(
        &self,
        target: Address,
        call: WriteCall,
    ) -> Result<TxId, WriteError> {
        let data =
            encode_calldata(call.function, &call.args).map_err(WriteError::Submission)?;
        let mut tx = json!({
            "from": self.from.to_string(),
            "to": target.to_string(),
            "data": data,
        });
        if call.value > 0 {
            tx["value"] = json!(format!("0x{:x}", call.value));
        }
        let result = self
            .request("eth_sendTransaction", json!([tx]))
            .await
            .map_err(WriteError::Submission)?;
        let raw = result.as_str().ok_or_else(|| {
            WriteError::Submission("transaction id is not a string".to_string())
        })?;
        raw.parse()
            .map_err(|err| WriteError::Submission(format!("{err}")))
    }

    async fn await_confirmation(
        &self,
        tx_id: TxId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Receipt, WriteError> {
        let started = Instant::now();
        loop {
            match self
                .request("eth_getTransactionReceipt", json!([tx_id.to_string()]))
                .await
            {
                Ok(Value::Null) => {}
                Ok(receipt) => {
                    let status = receipt.get("status").and_then(Value::as_str);
                    match status {
                        Some("0x0") => {
                            // Receipts carry no revert reason; nodes surface a
                            // decodable reason only through call simulation.
                            return Err(WriteError::Reverted { reason: None });
                        }
                        Some("0x1") => {}
                        other => {
                            warn!(
                                tx = %tx_id,
                                ?other,
                                "receipt missing status field; treating as success"
                            );
                        }
                    }
                    let block_number = receipt
                        .get("blockNumber")
                        .and_then(Value::as_str)
                        .and_then(|raw| parse_hex_u64(raw).ok())
                        .unwrap_or_default();
                    return Ok(Receipt {
                        tx_id,
                        block_number,
                    });
                }
                // Transient transport failures do not fail the wait; the
                // timeout budget bounds how long they can stall it.
                Err(err) => {
                    warn!(tx = %tx_id, %err, "receipt poll failed; retrying");
                }
            }
            if started.elapsed() >= timeout {
                return Err(WriteError::Timeout {
                    waited: started.elapsed(),
                });
            }
            time::sleep(poll_interval).await;
        }
    }
}

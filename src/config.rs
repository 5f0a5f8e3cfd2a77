use crate::ledger::Address;

/// Connection and contract wiring, injected at construction. No ambient
/// process state; the binary builds this from its CLI flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// Lottery contract address.
    pub lottery: Address,
    /// Payment token contract address.
    pub token: Address,
    /// Account the client acts as.
    pub account: Address,
}

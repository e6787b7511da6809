use ethers::contract::abigen;

// Minimal ERC-20 ABI for wallet-side reads.
//
// Only the views the orchestrator needs: allowance-aware spend decisions and
// token descriptors. Write calldata is produced by the pure encoders instead.
abigen!(
    Erc20,
    r#"[
        function allowance(address owner, address spender) view returns (uint256)
        function balanceOf(address owner) view returns (uint256)
        function name() view returns (string)
        function symbol() view returns (string)
        function decimals() view returns (uint8)
    ]"#
);

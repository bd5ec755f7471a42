//! Contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the bridge relay
//! entry points and the ERC-20 subset the orchestrator touches.

use alloy::sol;

sol! {
    /// Bridge contract relay entry points
    #[sol(rpc)]
    contract Bridge {
        /// Relay the chain's native asset; the amount is the transaction value
        function relayNative(address receiver) external payable;

        /// Relay an ERC-20; requires a prior allowance for this contract
        function relayTokens(address token, address receiver, uint256 amount) external;
    }

    /// ERC20 balance and allowance calls
    #[sol(rpc)]
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

//! # Contract ABI
//!
//! Solidity declarations for the deployed token constructor and the events
//! the ledger and factory emit. `sol!` generates the Rust types together with
//! their ABI codecs, event signature hashes and topic encoding.
//!
//! The declarations mirror the on-chain contracts exactly; an explorer
//! compares constructor arguments byte for byte, and wallets match logs by
//! `topics[0]`.

use alloy_sol_types::sol;

sol! {
    /// The deployed token contract. Only the constructor matters off-chain:
    /// its arguments are what the explorer needs to rebuild the deployment.
    #[derive(Debug, PartialEq, Eq)]
    contract ERC20Custom {
        constructor(
            string _name,
            string _symbol,
            uint8 _decimals,
            uint256 _initialSupply,
            address _owner,
            bool _isMintable,
            bool _isBurnable
        );
    }

    /// Balance movement, including mints (`from` = 0) and burns (`to` = 0).
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);

    /// Allowance set or rewritten.
    #[derive(Debug, PartialEq, Eq)]
    event Approval(address indexed owner, address indexed spender, uint256 value);

    /// Emitted by the factory once per created token.
    #[derive(Debug, PartialEq, Eq)]
    event TokenCreated(
        address indexed tokenAddress,
        address indexed owner,
        string name,
        string symbol,
        uint8 decimals,
        uint256 initialSupply
    );
}

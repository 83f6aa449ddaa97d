//! Solidity interface of the root chain contract.

#![allow(missing_docs, missing_debug_implementations)]

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface RootChain {
        event Deposit(uint64 indexed slot, uint256 blockNumber, address indexed from);
        event StartedExit(uint64 indexed slot, address indexed owner);
        event CoinReset(uint64 indexed slot, address indexed owner);
        event FinalizedExit(uint64 indexed slot, address owner);
        event ChallengedExit(uint64 indexed slot);
        event RespondedExitChallenge(uint64 indexed slot);
        event SubmittedBlock(uint256 blockNumber, bytes32 root, uint256 timestamp);

        function submitBlock(uint256 blockNumber, bytes32 root) external;

        function challengeAfter(
            uint64 slot,
            bytes challengingTransaction,
            bytes proof,
            bytes signature,
            uint256 challengingBlockNumber
        ) external;

        function challengeBetween(
            uint64 slot,
            bytes challengingTransaction,
            bytes proof,
            bytes signature,
            uint256 challengingBlockNumber
        ) external;

        function challengeBefore(
            uint64 slot,
            bytes challengingTransaction,
            bytes proof,
            uint256 challengingBlockNumber
        ) external;

        function getExit(uint64 slot)
            external
            view
            returns (address owner, uint256 prevBlock, uint256 exitBlock, uint8 state);
    }
}

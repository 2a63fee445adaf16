//! Solidity interface definitions for the clawpoly contracts.
//!
//! Only the functions the API server calls are declared:
//! - [`ISearchReceipt`] - receipt anchoring
//! - [`IEndpointRegistry`] - endpoint metadata
//! - [`IPricingRegistry`] - per-endpoint prices, keyed by `keccak256(endpointId)`

use alloy_sol_types::sol;

sol! {
    /// Append-only log of query receipts.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ISearchReceipt {
        function recordReceipt(
            bytes32 queryHash,
            bytes32 responseHash,
            bytes32 evidenceRoot,
            string uri
        ) external;
    }
}

sol! {
    /// Registry of purchasable endpoints.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IEndpointRegistry {
        struct Endpoint {
            string name;
            string description;
            string tags;
            bool enabled;
            address creator;
            uint256 createdAt;
            uint256 updatedAt;
        }

        function getEndpointCount() external view returns (uint256);
        function getEndpointIdByIndex(uint256 index) external view returns (bytes32);
        function getEndpoint(bytes32 endpointId) external view returns (Endpoint memory);
    }
}

sol! {
    /// Price table for registered endpoints, in token micro-units.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IPricingRegistry {
        function getPrice(bytes32 endpointId) external view returns (uint256);
    }
}

use alloy::sol;

// ─── Round Factory ──────────────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract RoundFactory {
        struct MilestoneParams {
            string description;
            uint256 amount;
            uint256 deadline;
        }

        event RoundCreated(
            uint256 indexed roundId,
            address indexed roundAddress,
            address indexed founder,
            address fundingToken,
            uint256 targetAmount
        );

        // === Liveness / admin views ===
        function nextRoundId() external view returns (uint256);
        function paused() external view returns (bool);
        function isAuthorizedJuror(address juror) external view returns (bool);

        // === Round creation ===
        function createRound(
            address fundingToken,
            uint256 targetAmount,
            uint256 fundingDeadline,
            MilestoneParams[] calldata milestones,
            address[] calldata jurors
        ) external returns (uint256 roundId, address roundAddress);
    }
}

// ─── ERC-20 ─────────────────────────────────────────────────────────────────
sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract ERC20 {
        event Transfer(address indexed from, address indexed to, uint256 amount);

        function decimals() external view returns (uint8);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

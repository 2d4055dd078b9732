// src/contracts.rs
use ethers::prelude::abigen;

abigen!(
    FeeToken,
    r#"[
        function name() external view returns (string)
        function version() external view returns (string)
        function nonces(address owner) external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
        function transfer(address recipient, uint256 amount) external returns (bool)
        function permit(address owner, address spender, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external
    ]"#
);

abigen!(
    AirdropClaimer,
    r#"[
        function claimTokens() external
        function isEligible(address user) external view returns (bool)
        function hasClaimed(address user) external view returns (bool)
    ]"#
);

abigen!(
    TokenPaymaster,
    r#"[
        function additionalGasCharge() external view returns (uint256)
    ]"#
);

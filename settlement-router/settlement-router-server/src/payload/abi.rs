//! ABI definitions for the settlement router contracts

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use alloy::sol;

sol! {
    #[sol(rpc, all_derives)]
    interface IYodlRouterV2 {
        struct YodlUniswapParams {
            address sender;
            address receiver;
            uint256 amountIn;
            uint256 amountOut;
            bytes32 memo;
            bytes path;
            address[2] priceFeeds;
            address extraFeeReceiver;
            uint256 extraFeeBps;
            bool returnRemainder;
            uint8 swapType;
        }

        struct YodlCurveParams {
            address sender;
            address receiver;
            uint256 amountIn;
            uint256 amountOut;
            bytes32 memo;
            address[9] route;
            uint256[3][4] swapParams;
            address[4] factoryAddresses;
            address[2] priceFeeds;
            address extraFeeReceiver;
            uint256 extraFeeBps;
            bool returnRemainder;
        }

        function payWithToken(
            bytes32 memo,
            uint256 amount,
            address[2] calldata priceFeeds,
            address token,
            address receiver,
            address extraFeeReceiver,
            uint256 extraFeeBps
        ) external payable returns (uint256);

        function payWithUniswap(YodlUniswapParams calldata params) external payable returns (uint256);

        function payWithCurve(YodlCurveParams calldata params) external payable returns (uint256);

        function exchangeRate(address[2] calldata priceFeeds, uint256 amount)
            external
            view
            returns (uint256 converted, address[2] memory priceFeedsUsed, int256[2] memory prices);
    }
}

sol! {
    #[sol(rpc, all_derives)]
    interface IYodlRouterV1 {
        function payWithToken(
            bytes32 memo,
            uint256 amount,
            address[] calldata priceFeeds,
            address token,
            address receiver,
            address extraFeeReceiver,
            uint256 extraFeeDivisor
        ) external returns (bool);

        function exchangeRate(address[] calldata priceFeeds, uint256 amount)
            external
            view
            returns (uint256 converted, address[] memory priceFeedsUsed, int256[] memory prices);
    }
}

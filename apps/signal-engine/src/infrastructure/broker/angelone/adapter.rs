//! AngelOne broker adapter implementing `BrokerGateway`.

use async_trait::async_trait;

use crate::application::ports::{
    BrokerError, BrokerGateway, BrokerSession, LtpQuote, OrderAck, PlaceOrderRequest,
    PositionSnapshot,
};
use crate::domain::order::OrderVariety;
use crate::domain::shared::{BrokerOrderId, SymbolToken};

use super::api_types::{
    CancelOrderData, CancelOrderParams, LtpData, LtpParams, PlaceOrderData, PlaceOrderParams,
    PositionData,
};
use super::config::AngelOneConfig;
use super::error::AngelOneError;
use super::http_client::AngelOneHttpClient;

const PLACE_ORDER_PATH: &str = "/rest/secure/angelbroking/order/v1/placeOrder";
const CANCEL_ORDER_PATH: &str = "/rest/secure/angelbroking/order/v1/cancelOrder";
const LTP_DATA_PATH: &str = "/rest/secure/angelbroking/order/v1/getLtpData";
const GET_POSITION_PATH: &str = "/rest/secure/angelbroking/order/v1/getPosition";

/// AngelOne SmartAPI broker adapter.
#[derive(Debug, Clone)]
pub struct AngelOneBrokerAdapter {
    client: AngelOneHttpClient,
}

impl AngelOneBrokerAdapter {
    /// Create a new adapter.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is unusable (empty API key, TLS init).
    pub fn new(config: AngelOneConfig) -> Result<Self, AngelOneError> {
        Ok(Self {
            client: AngelOneHttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl BrokerGateway for AngelOneBrokerAdapter {
    async fn place_order(
        &self,
        session: &BrokerSession,
        request: &PlaceOrderRequest,
    ) -> Result<OrderAck, BrokerError> {
        let params = PlaceOrderParams::from(request);
        tracing::info!(
            client_id = %session.client_id,
            symbol = %request.symbol,
            variety = %request.variety,
            order_type = %request.order_type,
            txn_type = %request.txn_type,
            quantity = request.quantity,
            "placing order"
        );
        let data: PlaceOrderData = self
            .client
            .post(session, PLACE_ORDER_PATH, &params)
            .await
            .map_err(BrokerError::from)?
            .ok_or(AngelOneError::MissingData)
            .map_err(BrokerError::from)?;
        Ok(data.into_order_ack())
    }

    async fn cancel_order(
        &self,
        session: &BrokerSession,
        variety: OrderVariety,
        order_id: &BrokerOrderId,
    ) -> Result<(), BrokerError> {
        let params = CancelOrderParams {
            variety: variety.as_str().to_string(),
            orderid: order_id.as_str().to_string(),
        };
        tracing::info!(
            client_id = %session.client_id,
            order_id = %order_id,
            variety = %variety,
            "cancelling order"
        );
        let _: Option<CancelOrderData> = self
            .client
            .post(session, CANCEL_ORDER_PATH, &params)
            .await
            .map_err(BrokerError::from)?;
        Ok(())
    }

    async fn ltp(
        &self,
        session: &BrokerSession,
        exchange: &str,
        symbol: &str,
        symbol_token: &SymbolToken,
    ) -> Result<LtpQuote, BrokerError> {
        let params = LtpParams {
            exchange: exchange.to_string(),
            tradingsymbol: symbol.to_string(),
            symboltoken: symbol_token.as_str().to_string(),
        };
        let data: LtpData = self
            .client
            .post(session, LTP_DATA_PATH, &params)
            .await
            .map_err(BrokerError::from)?
            .ok_or(AngelOneError::MissingData)
            .map_err(BrokerError::from)?;
        Ok(data.into_quote())
    }

    async fn positions(
        &self,
        session: &BrokerSession,
    ) -> Result<Vec<PositionSnapshot>, BrokerError> {
        // A flat book comes back as a success envelope with null data.
        let rows: Option<Vec<PositionData>> = self
            .client
            .get(session, GET_POSITION_PATH)
            .await
            .map_err(BrokerError::from)?;
        Ok(rows
            .unwrap_or_default()
            .into_iter()
            .map(PositionData::into_snapshot)
            .collect())
    }
}

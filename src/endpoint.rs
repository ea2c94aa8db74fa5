//! Route templates of the Asaas v3 API.
//!
//! Use with [`Route::bind`](crate::Route::bind):
//!
//! ```rust
//! use ratequeue::{endpoint, Route};
//! let route = Route::bind(endpoint::PAYMENTS_REFUND, ["pay_123"]);
//! assert_eq!(route.endpoint(), "payments/pay_123/refund");
//! ```

pub const CUSTOMER: &str = "customers";
pub const CUSTOMER_GET: &str = "customers/:id";
pub const CUSTOMER_CHANGE: &str = "customers/:id";
pub const CUSTOMER_RESTORE: &str = "customers/:id/restore";

pub const CUSTOMER_NOTIFICATIONS: &str = "customers/:id/notifications";
pub const NOTIFICATIONS_UPDATE: &str = "customers/:id/notifications";
pub const NOTIFICATIONS_UPDATE_BATCH: &str = "notifications/batch";

pub const PAYMENTS: &str = "payments";
pub const PAYMENTS_GET: &str = "payments/:id";
pub const PAYMENTS_CHANGE: &str = "payments/:id";
pub const PAYMENTS_RESTORE: &str = "payments/:id/restore";
pub const PAYMENTS_REFUND: &str = "payments/:id/refund";
pub const PAYMENTS_PAY_WITH_CREDIT_CARD: &str = "payments/:id/payWithCreditCard";
pub const PAYMENTS_IDENTIFICATION_FIELD: &str = "payments/:id/identificationField";
pub const PAYMENTS_PIX: &str = "payments/:id/pixQrCode";
pub const PAYMENTS_RECEIVE_IN_CASH: &str = "payments/:id/receiveInCash";
pub const PAYMENTS_UNDO_RECEIVE_IN_CASH: &str = "payments/:id/undoReceivedInCash";

pub const INSTALLMENTS: &str = "installments";
pub const INSTALLMENTS_GET: &str = "installments/:id";
pub const INSTALLMENTS_CHANGE: &str = "installments/:id";
pub const INSTALLMENTS_REFUND: &str = "installments/:id/refund";

pub const SUBSCRIPTION: &str = "subscriptions";
pub const SUBSCRIPTION_GET: &str = "subscriptions/:id";
pub const SUBSCRIPTION_CHANGE: &str = "subscriptions/:id";
pub const SUBSCRIPTION_BILLINGS: &str = "subscriptions/:id/payments";
pub const SUBSCRIPTION_INVOICES: &str = "subscriptions/:id/invoices";
pub const SUBSCRIPTION_INVOICES_SETTINGS: &str = "subscriptions/:id/invoiceSettings";

pub const PAYMENT_LINK: &str = "paymentLinks";
pub const PAYMENT_LINK_GET: &str = "paymentLinks/:id";
pub const PAYMENT_LINK_CHANGE: &str = "paymentLinks/:id";
pub const PAYMENT_LINK_RESTORE: &str = "paymentLinks/:id/restore";
pub const PAYMENT_LINK_IMAGES: &str = "paymentLinks/:id/images";
pub const PAYMENT_LINK_IMAGE_GET: &str = "paymentLinks/:id/images/:imageId";
pub const PAYMENT_LINK_IMAGE_SET_AS_MAIN: &str = "paymentLinks/:id/images/:imageId/setAsMain";

pub const TOKENIZE_CREDIT_CARD: &str = "creditCard/tokenize";

pub const TRANSFERS: &str = "transfers";
pub const TRANSFERS_GET: &str = "transfers/:id";
pub const TRANSFERS_PIX_GET: &str = "pix/transactions";
pub const TRANSFERS_PIX_SCHEDULED_CANCEL: &str = "pix/transactions/:id/cancel";

pub const ANTICIPATIONS: &str = "anticipations";
pub const ANTICIPATIONS_GET: &str = "anticipations/:id";
pub const ANTICIPATIONS_SIMULATE: &str = "anticipations/simulate";

pub const DUNNINGS: &str = "paymentDunnings";
pub const DUNNINGS_GET: &str = "paymentDunnings/:id";
pub const DUNNINGS_SIMULATE: &str = "paymentDunnings/simulate";
pub const DUNNINGS_HISTORY: &str = "paymentDunnings/:id/history";
pub const DUNNINGS_PAYMENTS: &str = "paymentDunnings/:id/partialPayments";
pub const DUNNINGS_AVAILABLE: &str = "paymentDunnings/paymentsAvailableForDunning";
pub const DUNNINGS_DOCUMENTS: &str = "paymentDunnings/:id/documents";
pub const DUNNINGS_CANCEL: &str = "paymentDunnings/:id/cancel";

pub const BILL: &str = "bill";
pub const BILL_GET: &str = "bill/:id";
pub const BILL_SIMULATE: &str = "bill/simulate";
pub const BILL_CANCEL: &str = "bill/:id/cancel";

pub const PHONE_RECHARGE: &str = "mobilePhoneRecharges";
pub const PHONE_RECHARGE_GET: &str = "mobilePhoneRecharges/:id";
pub const PHONE_RECHARGE_CANCEL: &str = "mobilePhoneRecharges/:id/cancel";
pub const PHONE_RECHARGE_PROVIDER: &str = "mobilePhoneRecharges/:phoneNumber/provider";

pub const CREDIT_BUREAU: &str = "creditBureauReport";
pub const CREDIT_BUREAU_GET: &str = "creditBureauReport/:id";

pub const BANKING_STATEMENT: &str = "financialTransactions";

pub const BALANCE: &str = "finance/balance";
pub const BALANCE_STATISTICS: &str = "finance/payment/statistics";
pub const BALANCE_SPLIT_STATISTICS: &str = "finance/split/statistics";

pub const COMMERCIAL_INFO: &str = "myAccount/commercialInfo";
pub const COMMERCIAL_INFO_UPDATE: &str = "myAccount/commercialInfo";

pub const CHECKOUT_CONFIG: &str = "myAccount/paymentCheckoutConfig";
pub const CHECKOUT_CONFIG_GET: &str = "myAccount/paymentCheckoutConfig";

pub const ACCOUNT_NUMBER: &str = "myAccount/accountNumber";
pub const WALLET_ID: &str = "wallets";

pub const INVOICES: &str = "invoices";
pub const INVOICES_GET: &str = "invoices/:id";
pub const INVOICES_UPDATE: &str = "invoices/:id";
pub const INVOICES_CREATE: &str = "invoices/:id/authorize";
pub const INVOICES_CANCEL: &str = "invoices/:id/cancel";
pub const INVOICES_MUNICIPAL_SERVICES: &str = "invoices/municipalServices";

pub const FISCAL_INFO: &str = "customerFiscalInfo";
pub const FISCAL_INFO_CREATE: &str = "customerFiscalInfo";
pub const FISCAL_MUNICIPAL_INFO: &str = "customerFiscalInfo/municipalOptions";

pub const PIX_KEYS: &str = "pix/addressKeys";
pub const PIX_KEY_CREATE: &str = "pix/addressKeys";
pub const PIX_KEY_GET: &str = "pix/addressKeys/:id";
pub const PIX_KEY_REMOVE: &str = "pix/addressKeys/:id";

pub const QRCODE_STATIC_CREATE: &str = "pix/qrCodes/static";
pub const QRCODE_DECODE: &str = "pix/qrCodes/decode";
pub const QRCODE_PAY: &str = "pix/qrCodes/pay";

pub const WEBHOOK_PAYMENTS: &str = "webhook";
pub const WEBHOOK_INVOICES: &str = "webhook/invoice";
pub const WEBHOOK_TRANSFER: &str = "webhook/transfer";
pub const WEBHOOK_BILL: &str = "webhook/bill";
pub const WEBHOOK_ANTICIPATION: &str = "webhook/anticipation";
pub const WEBHOOK_PHONE_RECHARGE: &str = "webhook/mobilePhoneRecharge";

pub const SUB_ACCOUNT: &str = "accounts";

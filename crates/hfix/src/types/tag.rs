// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FIX tag numbers used by the engine.
//!
//! Only the tags the session layer and the shipped message views touch are
//! listed; application code is free to use any tag number with the runtime
//! builder and the lazy field lookup.

/// BeginString (always the first field).
pub const BEGIN_STRING: u32 = 8;
/// BodyLength (always the second field).
pub const BODY_LENGTH: u32 = 9;
/// CheckSum (always the last field, three decimal digits).
pub const CHECK_SUM: u32 = 10;
/// MsgSeqNum.
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType (always the third field).
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo (SequenceReset).
pub const NEW_SEQ_NO: u32 = 36;
/// OrderQty.
pub const ORDER_QTY: u32 = 38;
/// OrdStatus.
pub const ORD_STATUS: u32 = 39;
/// PossDupFlag.
pub const POSS_DUP_FLAG: u32 = 43;
/// Price.
pub const PRICE: u32 = 44;
/// RefSeqNum (Reject).
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID.
pub const SENDER_COMP_ID: u32 = 49;
/// SendingTime.
pub const SENDING_TIME: u32 = 52;
/// Side.
pub const SIDE: u32 = 54;
/// Symbol.
pub const SYMBOL: u32 = 55;
/// TargetCompID.
pub const TARGET_COMP_ID: u32 = 56;
/// Text (free-form diagnostic).
pub const TEXT: u32 = 58;
/// TransactTime.
pub const TRANSACT_TIME: u32 = 60;
/// BeginSeqNo (ResendRequest).
pub const BEGIN_SEQ_NO: u32 = 7;
/// EndSeqNo (ResendRequest, 0 = infinity).
pub const END_SEQ_NO: u32 = 16;
/// ClOrdID.
pub const CL_ORD_ID: u32 = 11;
/// OrigClOrdID (cancel flows).
pub const ORIG_CL_ORD_ID: u32 = 41;
/// OrderID.
pub const ORDER_ID: u32 = 37;
/// ExecID.
pub const EXEC_ID: u32 = 17;
/// ExecType.
pub const EXEC_TYPE: u32 = 150;
/// LeavesQty.
pub const LEAVES_QTY: u32 = 151;
/// CumQty.
pub const CUM_QTY: u32 = 14;
/// AvgPx.
pub const AVG_PX: u32 = 6;
/// LastQty.
pub const LAST_QTY: u32 = 32;
/// LastPx.
pub const LAST_PX: u32 = 31;
/// OrdType.
pub const ORD_TYPE: u32 = 40;
/// TimeInForce.
pub const TIME_IN_FORCE: u32 = 59;
/// EncryptMethod (Logon).
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt (Logon).
pub const HEART_BT_INT: u32 = 108;
/// TestReqID (TestRequest / Heartbeat echo).
pub const TEST_REQ_ID: u32 = 112;
/// GapFillFlag (SequenceReset).
pub const GAP_FILL_FLAG: u32 = 123;
/// ResetSeqNumFlag (Logon).
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// OrigSendingTime (resent messages).
pub const ORIG_SENDING_TIME: u32 = 122;
/// RefTagID (Reject).
pub const REF_TAG_ID: u32 = 371;
/// RefMsgType (Reject).
pub const REF_MSG_TYPE: u32 = 372;
/// SessionRejectReason (Reject).
pub const SESSION_REJECT_REASON: u32 = 373;
/// MDReqID (market data request/response).
pub const MD_REQ_ID: u32 = 262;
/// SubscriptionRequestType.
pub const SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
/// MarketDepth.
pub const MARKET_DEPTH: u32 = 264;
/// NoMDEntryTypes (request group counter).
pub const NO_MD_ENTRY_TYPES: u32 = 267;
/// NoMDEntries (snapshot/incremental group counter).
pub const NO_MD_ENTRIES: u32 = 268;
/// MDEntryType.
pub const MD_ENTRY_TYPE: u32 = 269;
/// MDEntryPx.
pub const MD_ENTRY_PX: u32 = 270;
/// MDEntrySize.
pub const MD_ENTRY_SIZE: u32 = 271;
/// MDUpdateAction (incremental refresh).
pub const MD_UPDATE_ACTION: u32 = 279;
/// CxlRejResponseTo (OrderCancelReject).
pub const CXL_REJ_RESPONSE_TO: u32 = 434;

/// SessionRejectReason code: value is incorrect (out of range) for this tag.
pub const REJECT_REASON_VALUE_INCORRECT: u32 = 5;
/// SessionRejectReason code: incorrect data format for value.
pub const REJECT_REASON_BAD_FORMAT: u32 = 6;
/// SessionRejectReason code: CompID problem.
pub const REJECT_REASON_COMP_ID: u32 = 9;

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed accessors over parsed messages.
//!
//! Thin wrappers that name the fields of each covered message type. A view
//! constructor returns `None` when the message type does not match; field
//! accessors convert lazily and surface [`ValueError`] for bad values.

use crate::types::tag;
use crate::types::{Decimal, MsgType};

use super::field::ValueError;
use super::group::{GroupIter, MD_ENTRIES_GROUP};
use super::message::ParsedMessage;

macro_rules! typed_view {
    ($(#[$doc:meta])* $name:ident, $msg_type:pat) => {
        $(#[$doc])*
        pub struct $name<'m, 'a> {
            msg: &'m ParsedMessage<'a>,
        }

        impl<'m, 'a> $name<'m, 'a> {
            /// Wrap a parsed message; `None` when the type differs.
            #[must_use]
            pub fn from_message(msg: &'m ParsedMessage<'a>) -> Option<Self> {
                matches!(msg.msg_type(), $msg_type).then_some(Self { msg })
            }

            /// Underlying parsed message.
            #[must_use]
            pub fn message(&self) -> &'m ParsedMessage<'a> {
                self.msg
            }
        }
    };
}

fn required<'a>(
    msg: &ParsedMessage<'a>,
    tag_number: u32,
) -> Result<super::field::FieldView<'a>, ValueError> {
    msg.field(tag_number).ok_or(ValueError {
        tag: tag_number,
        reason: "required field absent",
    })
}

// ============================================================================
// Administrative messages
// ============================================================================

typed_view!(
    /// Logon (35=A).
    Logon,
    MsgType::Logon
);

impl Logon<'_, '_> {
    /// HeartBtInt(108) in seconds.
    pub fn heart_bt_int(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::HEART_BT_INT)?.as_u32()
    }

    /// EncryptMethod(98); 0 = none.
    pub fn encrypt_method(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::ENCRYPT_METHOD)?.as_u32()
    }

    /// ResetSeqNumFlag(141)=Y.
    #[must_use]
    pub fn reset_seq_num(&self) -> bool {
        self.msg
            .field(tag::RESET_SEQ_NUM_FLAG)
            .and_then(|f| f.as_bool().ok())
            .unwrap_or(false)
    }
}

typed_view!(
    /// Heartbeat (35=0).
    Heartbeat,
    MsgType::Heartbeat
);

impl<'a> Heartbeat<'_, 'a> {
    /// TestReqID(112) when replying to a TestRequest.
    #[must_use]
    pub fn test_req_id(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::TEST_REQ_ID).map(|f| f.as_bytes())
    }
}

typed_view!(
    /// TestRequest (35=1).
    TestRequest,
    MsgType::TestRequest
);

impl<'a> TestRequest<'_, 'a> {
    /// TestReqID(112), required.
    pub fn test_req_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::TEST_REQ_ID)?.as_bytes())
    }
}

typed_view!(
    /// ResendRequest (35=2).
    ResendRequest,
    MsgType::ResendRequest
);

impl ResendRequest<'_, '_> {
    /// BeginSeqNo(7).
    pub fn begin_seq_no(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::BEGIN_SEQ_NO)?.as_seq_num()
    }

    /// EndSeqNo(16); 0 means "through the latest".
    pub fn end_seq_no(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::END_SEQ_NO)?.as_u32()
    }
}

typed_view!(
    /// Reject (35=3).
    Reject,
    MsgType::Reject
);

impl<'a> Reject<'_, 'a> {
    /// RefSeqNum(45).
    pub fn ref_seq_num(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::REF_SEQ_NUM)?.as_u32()
    }

    /// RefTagID(371), when cited.
    #[must_use]
    pub fn ref_tag_id(&self) -> Option<u32> {
        self.msg.field(tag::REF_TAG_ID).and_then(|f| f.as_u32().ok())
    }

    /// SessionRejectReason(373), when cited.
    #[must_use]
    pub fn reason(&self) -> Option<u32> {
        self.msg
            .field(tag::SESSION_REJECT_REASON)
            .and_then(|f| f.as_u32().ok())
    }

    /// Text(58), when present.
    #[must_use]
    pub fn text(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::TEXT).map(|f| f.as_bytes())
    }
}

typed_view!(
    /// SequenceReset (35=4).
    SequenceReset,
    MsgType::SequenceReset
);

impl SequenceReset<'_, '_> {
    /// GapFillFlag(123)=Y.
    #[must_use]
    pub fn gap_fill(&self) -> bool {
        self.msg
            .field(tag::GAP_FILL_FLAG)
            .and_then(|f| f.as_bool().ok())
            .unwrap_or(false)
    }

    /// NewSeqNo(36).
    pub fn new_seq_no(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::NEW_SEQ_NO)?.as_seq_num()
    }
}

typed_view!(
    /// Logout (35=5).
    Logout,
    MsgType::Logout
);

impl<'a> Logout<'_, 'a> {
    /// Text(58), when present.
    #[must_use]
    pub fn text(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::TEXT).map(|f| f.as_bytes())
    }
}

// ============================================================================
// Application messages
// ============================================================================

typed_view!(
    /// NewOrderSingle (35=D).
    NewOrderSingle,
    MsgType::NewOrderSingle
);

impl<'a> NewOrderSingle<'_, 'a> {
    /// ClOrdID(11).
    pub fn cl_ord_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::CL_ORD_ID)?.as_bytes())
    }

    /// Symbol(55).
    pub fn symbol(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::SYMBOL)?.as_bytes())
    }

    /// Side(54) as its wire character.
    pub fn side(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::SIDE)?.as_char()
    }

    /// OrderQty(38).
    pub fn order_qty(&self) -> Result<Decimal, ValueError> {
        required(self.msg, tag::ORDER_QTY)?.as_decimal()
    }

    /// Price(44), absent for market orders.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.msg.field(tag::PRICE).and_then(|f| f.as_decimal().ok())
    }

    /// OrdType(40).
    pub fn ord_type(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::ORD_TYPE)?.as_char()
    }
}

typed_view!(
    /// OrderCancelRequest (35=F).
    OrderCancelRequest,
    MsgType::OrderCancelRequest
);

impl<'a> OrderCancelRequest<'_, 'a> {
    /// ClOrdID(11) of the cancel itself.
    pub fn cl_ord_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::CL_ORD_ID)?.as_bytes())
    }

    /// OrigClOrdID(41), the order being cancelled.
    pub fn orig_cl_ord_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::ORIG_CL_ORD_ID)?.as_bytes())
    }

    /// Symbol(55).
    pub fn symbol(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::SYMBOL)?.as_bytes())
    }

    /// Side(54).
    pub fn side(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::SIDE)?.as_char()
    }
}

typed_view!(
    /// OrderCancelReject (35=9).
    OrderCancelReject,
    MsgType::OrderCancelReject
);

impl<'a> OrderCancelReject<'_, 'a> {
    /// ClOrdID(11) of the rejected cancel.
    pub fn cl_ord_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::CL_ORD_ID)?.as_bytes())
    }

    /// OrderID(37), `NONE` when unknown.
    pub fn order_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::ORDER_ID)?.as_bytes())
    }

    /// CxlRejResponseTo(434).
    pub fn responding_to(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::CXL_REJ_RESPONSE_TO)?.as_char()
    }

    /// Text(58), when present.
    #[must_use]
    pub fn text(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::TEXT).map(|f| f.as_bytes())
    }
}

typed_view!(
    /// MarketDataRequest (35=V).
    MarketDataRequest,
    MsgType::MarketDataRequest
);

impl<'a> MarketDataRequest<'_, 'a> {
    /// MDReqID(262).
    pub fn md_req_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::MD_REQ_ID)?.as_bytes())
    }

    /// SubscriptionRequestType(263): 0=snapshot, 1=subscribe, 2=unsubscribe.
    pub fn subscription_type(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::SUBSCRIPTION_REQUEST_TYPE)?.as_char()
    }

    /// MarketDepth(264): 0=full book, 1=top of book.
    pub fn market_depth(&self) -> Result<u32, ValueError> {
        required(self.msg, tag::MARKET_DEPTH)?.as_u32()
    }

    /// Symbol(55) of the first requested instrument, when present.
    #[must_use]
    pub fn symbol(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::SYMBOL).map(|f| f.as_bytes())
    }
}

typed_view!(
    /// ExecutionReport (35=8).
    ExecutionReport,
    MsgType::ExecutionReport
);

impl<'a> ExecutionReport<'_, 'a> {
    /// OrderID(37).
    pub fn order_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::ORDER_ID)?.as_bytes())
    }

    /// ExecID(17).
    pub fn exec_id(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::EXEC_ID)?.as_bytes())
    }

    /// ExecType(150).
    pub fn exec_type(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::EXEC_TYPE)?.as_char()
    }

    /// OrdStatus(39).
    pub fn ord_status(&self) -> Result<u8, ValueError> {
        required(self.msg, tag::ORD_STATUS)?.as_char()
    }

    /// Symbol(55).
    pub fn symbol(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::SYMBOL)?.as_bytes())
    }

    /// LastQty(32), present on fills.
    #[must_use]
    pub fn last_qty(&self) -> Option<Decimal> {
        self.msg
            .field(tag::LAST_QTY)
            .and_then(|f| f.as_decimal().ok())
    }

    /// LastPx(31), present on fills.
    #[must_use]
    pub fn last_px(&self) -> Option<Decimal> {
        self.msg
            .field(tag::LAST_PX)
            .and_then(|f| f.as_decimal().ok())
    }

    /// LeavesQty(151).
    pub fn leaves_qty(&self) -> Result<Decimal, ValueError> {
        required(self.msg, tag::LEAVES_QTY)?.as_decimal()
    }

    /// CumQty(14).
    pub fn cum_qty(&self) -> Result<Decimal, ValueError> {
        required(self.msg, tag::CUM_QTY)?.as_decimal()
    }
}

typed_view!(
    /// MarketDataSnapshot (35=W).
    MarketDataSnapshot,
    MsgType::MarketDataSnapshot
);

impl<'m, 'a> MarketDataSnapshot<'m, 'a> {
    /// MDReqID(262), when echoing a request.
    #[must_use]
    pub fn md_req_id(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::MD_REQ_ID).map(|f| f.as_bytes())
    }

    /// Symbol(55).
    pub fn symbol(&self) -> Result<&'a [u8], ValueError> {
        Ok(required(self.msg, tag::SYMBOL)?.as_bytes())
    }

    /// Iterate the `NoMDEntries(268)` group.
    #[must_use]
    pub fn entries(&self) -> Option<GroupIter<'m, 'a>> {
        GroupIter::new(self.msg, MD_ENTRIES_GROUP)
    }
}

typed_view!(
    /// MarketDataIncrementalRefresh (35=X).
    MarketDataIncremental,
    MsgType::MarketDataIncremental
);

impl<'m, 'a> MarketDataIncremental<'m, 'a> {
    /// MDReqID(262), when echoing a request.
    #[must_use]
    pub fn md_req_id(&self) -> Option<&'a [u8]> {
        self.msg.field(tag::MD_REQ_ID).map(|f| f.as_bytes())
    }

    /// Iterate the `NoMDEntries(268)` group.
    #[must_use]
    pub fn entries(&self) -> Option<GroupIter<'m, 'a>> {
        GroupIter::new(self.msg, MD_ENTRIES_GROUP)
    }
}

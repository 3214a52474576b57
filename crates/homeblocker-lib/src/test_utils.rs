use proptest::prelude::*;

use crate::{QueryType, Question};

prop_compose! {
    pub fn arb_question()(qname in arb_qname(), query_type in any::<u16>().prop_map(QueryType::from), qclass: u16) -> Question {
        Question { qname, query_type, qclass }
    }
}

fn arb_qname() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r"(([a-z0-9][a-z0-9-]{1,20}\.){1,4}[a-z0-9]{2,10})|")
        .expect("regex should be valid")
}

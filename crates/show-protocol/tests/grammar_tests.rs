//! Property tests for the device grammars
//!
//! Classification runs on untrusted network input, so it must never panic and
//! must agree with the requests the same grammar builds.

use proptest::prelude::*;
use show_protocol::{
    codec, create_grammar, eos::EosGrammar, x32::X32Grammar, Arg, Category, DeviceId, Family,
    Grammar, Inbound, Packet,
};

fn family() -> impl Strategy<Value = Family> {
    prop_oneof![Just(Family::Eos), Just(Family::X32)]
}

fn address() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("eos".to_string()),
            Just("out".to_string()),
            Just("get".to_string()),
            Just("notify".to_string()),
            Just("group".to_string()),
            Just("preset".to_string()),
            Just("ch".to_string()),
            Just("bus".to_string()),
            Just("list".to_string()),
            Just("count".to_string()),
            Just("config".to_string()),
            Just("name".to_string()),
            Just(String::new()),
            "[0-9]{1,3}",
            "[a-z0-9.-]{1,6}",
        ],
        0..9,
    )
    .prop_map(|segments| format!("/{}", segments.join("/")))
}

fn arg() -> impl Strategy<Value = Arg> {
    prop_oneof![
        any::<i32>().prop_map(Arg::Int),
        any::<f32>().prop_map(Arg::Float),
        "[ -~]{0,8}".prop_map(Arg::Str),
        Just(Arg::Nil),
    ]
}

proptest! {
    #[test]
    fn classify_never_panics(
        family in family(),
        address in address(),
        args in prop::collection::vec(arg(), 0..5),
    ) {
        let grammar = create_grammar(family, None);
        let packet = Packet { address, args };
        let _ = grammar.classify(&packet);
    }

    #[test]
    fn x32_probe_and_reply_agree(slot in 0u32..32, label in "[A-Za-z ]{1,12}") {
        let grammar = X32Grammar::new();
        let probe = grammar.index_request(Category::Channel, slot);
        let reply = Packet::new(probe.address.clone()).with_arg(label.as_str());

        prop_assert_eq!(
            grammar.classify(&reply).unwrap(),
            Inbound::Label {
                category: Category::Channel,
                id: DeviceId::new(format!("{:02}", slot + 1)),
                label,
                index: Some(slot),
            }
        );
    }

    #[test]
    fn eos_list_reply_carries_index(id in 1u32..10_000, index in 0u32..1000, label in "[ -~]{1,16}") {
        let reply = Packet::new(format!("/eos/out/get/preset/{}/list/{}/1000", id, index))
            .with_arg(index as i32)
            .with_arg("uid")
            .with_arg(label.as_str());

        let Inbound::Label { id: got, index: got_index, label: got_label, .. } =
            EosGrammar::new().classify(&reply).unwrap()
        else {
            return Err(TestCaseError::fail("expected a label"));
        };
        prop_assert_eq!(got, DeviceId::from(id));
        prop_assert_eq!(got_index, Some(index));
        prop_assert_eq!(got_label, label);
    }

    #[test]
    fn codec_preserves_requests(family in family(), slot in 0u32..16) {
        let grammar = create_grammar(family, None);
        for &category in grammar.categories() {
            let request = grammar.index_request(category, slot);
            let decoded = codec::decode(&codec::encode(&request).unwrap()).unwrap();
            prop_assert_eq!(decoded, vec![request]);
        }
    }
}

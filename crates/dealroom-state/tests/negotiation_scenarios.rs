//! End-to-end negotiation scenarios driven through the public `DealRoom` API.

use dealroom_catalog::{parse_template, ContractTemplate};
use dealroom_core::{Flexibility, OptionId, PartyRole, Priority, UserId};
use dealroom_negotiation::{FairnessRebalancer, Strategy, SAME_CHOICE_REASONING};
use dealroom_state::{
    AuditAction, ClauseStatus, CounterProposalInput, DealRoom, DealStatus, NegotiationError,
    NewDeal, PartyStatus, ProposalStatus, SelectionInput,
};

const SUPPLY_AGREEMENT: &str = r#"
contract_type: supply-agreement
title: Supply Agreement
clauses:
  - key: delivery-terms
    title: Delivery Terms
    options:
      - { id: exw, order: 1, label: Ex Works, bias_a: 0.5, bias_b: -0.5 }
      - { id: fca, order: 2, label: Free Carrier, bias_a: 0.0, bias_b: 0.0 }
      - { id: ddp, order: 3, label: Delivered Duty Paid, bias_a: -0.5, bias_b: 0.5 }
  - key: payment-terms
    title: Payment Terms
    options:
      - { id: net-15, order: 1, label: Net 15, bias_a: 0.8, bias_b: -0.8 }
      - { id: net-30, order: 2, label: Net 30, bias_a: 0.4, bias_b: -0.4 }
      - { id: net-45, order: 3, label: Net 45, bias_a: 0.0, bias_b: 0.0 }
      - { id: net-60, order: 4, label: Net 60, bias_a: -0.4, bias_b: 0.4 }
      - { id: net-90, order: 5, label: Net 90, bias_a: -0.8, bias_b: 0.8 }
  - key: liability-cap
    title: Liability Cap
    options:
      - { id: unlimited, order: 1, label: Unlimited, bias_a: 0.8, bias_b: -0.8 }
      - { id: three-x, order: 2, label: 3x fees, bias_a: 0.4, bias_b: -0.4 }
      - { id: two-x, order: 3, label: 2x fees, bias_a: 0.0, bias_b: 0.0 }
      - { id: one-x, order: 4, label: 1x fees, bias_a: -0.1, bias_b: 0.1 }
      - { id: fees-paid, order: 5, label: Fees paid, bias_a: -0.4, bias_b: 0.4 }
"#;

fn template() -> ContractTemplate {
    parse_template(SUPPLY_AGREEMENT).unwrap()
}

fn opt(id: &str) -> OptionId {
    OptionId::new(id).unwrap()
}

fn selection(room: &DealRoom, clause: usize, option: &str, p: i64, f: i64) -> SelectionInput {
    SelectionInput {
        clause_id: room.clauses()[clause].id,
        option_id: opt(option),
        priority: Priority::new(p).unwrap(),
        flexibility: Flexibility::new(f).unwrap(),
    }
}

/// Deal with both parties joined and the canonical selections submitted:
/// same choice on delivery, opposed equal stakes on payment, and a high
/// stake initiator against a flexible respondent on liability.
fn scenario() -> (DealRoom, UserId, UserId) {
    let alice = UserId::new();
    let bob = UserId::new();
    let mut room = DealRoom::create(
        &template(),
        NewDeal {
            title: "Widget supply 2026".into(),
            governing_law: Some("Delaware".into()),
            initiator_name: "Acme Ltd".into(),
            initiator_email: None,
        },
        alice,
    )
    .unwrap();
    let code = room.invite(alice, "Globex", None).unwrap().invitation_code.unwrap();
    room.accept_invitation(bob, &code).unwrap();

    let a = vec![
        selection(&room, 0, "fca", 3, 3),
        selection(&room, 1, "net-15", 4, 2),
        selection(&room, 2, "unlimited", 4, 2),
    ];
    let b = vec![
        selection(&room, 0, "fca", 3, 3),
        selection(&room, 1, "net-90", 4, 2),
        selection(&room, 2, "one-x", 2, 5),
    ];
    room.bulk_save_selections(alice, &a).unwrap();
    room.bulk_save_selections(bob, &b).unwrap();
    room.submit_all(alice).unwrap();
    let outcome = room.submit_all(bob).unwrap();
    assert!(outcome.both_submitted);
    assert_eq!(outcome.agreed_on_submit, 0);
    (room, alice, bob)
}

fn rb() -> FairnessRebalancer {
    FairnessRebalancer::default()
}

#[test]
fn first_round_follows_each_branch() {
    let (mut room, alice, _) = scenario();
    let outcome = room.generate(alice, &rb()).unwrap();
    assert_eq!(outcome.round_number, 1);
    assert_eq!(outcome.agreed_clause_ids, vec![room.clauses()[0].id]);

    let delivery = room.current_suggestion(room.clauses()[0].id).unwrap();
    assert_eq!(delivery.suggested_option_id, opt("fca"));
    assert_eq!(delivery.satisfaction_a.value(), 100);
    assert_eq!(delivery.satisfaction_b.value(), 100);
    assert_eq!(delivery.reasoning, SAME_CHOICE_REASONING);
    assert_eq!(room.clauses()[0].status, ClauseStatus::Agreed);
    assert_eq!(room.clauses()[0].agreed_option_id, Some(opt("fca")));

    let payment = room.current_suggestion(room.clauses()[1].id).unwrap();
    assert_eq!(payment.suggested_option_id, opt("net-45"));
    assert_eq!(payment.strategy, Some(Strategy::MiddleGround));
    assert_eq!(payment.satisfaction_a.value(), 50);
    assert_eq!(payment.satisfaction_b.value(), 50);

    let liability = room.current_suggestion(room.clauses()[2].id).unwrap();
    assert_eq!(liability.suggested_option_id, opt("unlimited"));
    assert_eq!(
        liability.strategy,
        Some(Strategy::ExactChoice(PartyRole::Initiator))
    );
    assert_eq!(liability.satisfaction_a.value(), 100);
    assert_eq!(liability.satisfaction_b.value(), 37);
    assert!(!liability.fairness_adjusted);

    assert_eq!(room.deal().status, DealStatus::Negotiating);
    assert!(room
        .parties()
        .iter()
        .all(|p| p.status == PartyStatus::Reviewing));
}

#[test]
fn full_negotiation_through_signing() {
    let (mut room, alice, bob) = scenario();
    let mut agreed = vec![room.agreed_count()];

    room.generate(alice, &rb()).unwrap();
    agreed.push(room.agreed_count());

    let payment = room.clauses()[1].id;
    let liability = room.clauses()[2].id;
    room.respond(alice, payment, true, Some(1)).unwrap();
    agreed.push(room.agreed_count());
    room.respond(bob, payment, true, Some(1)).unwrap();
    agreed.push(room.agreed_count());

    let proposal = room
        .counter_propose(
            bob,
            CounterProposalInput {
                clause_id: liability,
                option_id: opt("two-x"),
                rationale: Some("unlimited is uninsurable".into()),
                priority: None,
                round_number: Some(1),
            },
        )
        .unwrap();
    agreed.push(room.agreed_count());

    let outcome = room.regenerate(alice, &rb()).unwrap();
    agreed.push(room.agreed_count());
    assert_eq!(outcome.round_number, 2);
    assert_eq!(outcome.counters_applied, vec![liability]);
    assert_eq!(outcome.suggestion_count(), 1);

    let s = room.current_suggestion(liability).unwrap();
    assert_eq!(s.suggested_option_id, opt("two-x"));
    assert_eq!(s.strategy, Some(Strategy::CounterProposal(PartyRole::Respondent)));
    // span 3: A is 2 away, B is 1 away
    assert_eq!(s.satisfaction_a.value(), 67);
    assert_eq!(s.satisfaction_b.value(), 83);
    let superseded = room
        .counter_proposals()
        .iter()
        .find(|p| p.id == proposal.id)
        .unwrap();
    assert_eq!(superseded.status, ProposalStatus::Superseded);

    room.respond(alice, liability, true, Some(2)).unwrap();
    agreed.push(room.agreed_count());
    room.respond(bob, liability, true, Some(2)).unwrap();
    agreed.push(room.agreed_count());

    assert!(agreed.windows(2).all(|w| w[0] <= w[1]), "{agreed:?}");
    assert_eq!(room.deal().status, DealStatus::Agreed);
    assert!(room
        .parties()
        .iter()
        .all(|p| p.status == PartyStatus::Accepted));

    room.initiate_signing(bob).unwrap();
    assert!(!room.record_signature(alice).unwrap());
    assert!(room.record_signature(alice).is_err());
    assert!(room.record_signature(bob).unwrap());
    assert_eq!(room.deal().status, DealStatus::Completed);

    let actions: Vec<AuditAction> = room.take_audit().iter().map(|r| r.action).collect();
    for expected in [
        AuditAction::DealRoomCreated,
        AuditAction::SelectionsSubmitted,
        AuditAction::CompromiseGenerated,
        AuditAction::CounterProposalSubmitted,
        AuditAction::CompromiseRegenerated,
        AuditAction::DealAgreed,
        AuditAction::DealCompleted,
    ] {
        assert!(actions.contains(&expected), "missing {expected}");
    }
}

#[test]
fn counter_outside_the_span_is_ignored_on_regenerate() {
    let (mut room, alice, bob) = scenario();
    room.generate(alice, &rb()).unwrap();
    let liability = room.clauses()[2].id;

    // A chose order 1, B chose order 4; order 5 lies outside.
    room.counter_propose(
        bob,
        CounterProposalInput {
            clause_id: liability,
            option_id: opt("fees-paid"),
            rationale: None,
            priority: None,
            round_number: None,
        },
    )
    .unwrap();
    let outcome = room.regenerate(bob, &rb()).unwrap();
    assert!(outcome.counters_applied.is_empty());
    let s = room.current_suggestion(liability).unwrap();
    assert_eq!(s.round_number, 2);
    assert_eq!(s.suggested_option_id, opt("unlimited"));
    assert!(room
        .counter_proposals()
        .iter()
        .all(|p| p.status == ProposalStatus::Superseded));
}

#[test]
fn accepted_counter_agrees_the_clause() {
    let (mut room, alice, bob) = scenario();
    room.generate(alice, &rb()).unwrap();
    let liability = room.clauses()[2].id;
    let p = room
        .counter_propose(
            bob,
            CounterProposalInput {
                clause_id: liability,
                option_id: opt("three-x"),
                rationale: None,
                priority: Some(Priority::new(5).unwrap()),
                round_number: Some(1),
            },
        )
        .unwrap();

    assert_eq!(
        room.respond_to_counter_proposal(bob, p.id, true),
        Err(NegotiationError::BadRequest(
            "you cannot respond to your own counter-proposal".into()
        ))
    );
    let r = room.respond_to_counter_proposal(alice, p.id, true).unwrap();
    assert!(r.accepted);
    assert!(!r.all_agreed);
    assert_eq!(room.clause(liability).unwrap().agreed_option_id, Some(opt("three-x")));
    assert_eq!(room.agreed_count(), 2);
}

#[test]
fn stale_round_and_version_are_conflicts() {
    let (mut room, alice, bob) = scenario();
    room.generate(alice, &rb()).unwrap();
    let v = room.version();
    room.transact(Some(v), |r| r.regenerate(bob, &rb())).unwrap();

    let payment = room.clauses()[1].id;
    assert!(matches!(
        room.transact(None, |r| r.respond(alice, payment, true, Some(1))),
        Err(NegotiationError::Conflict(_))
    ));
    assert!(matches!(
        room.transact(Some(v), |r| r.respond(alice, payment, true, Some(2))),
        Err(NegotiationError::Conflict(_))
    ));
    room.transact(Some(v + 1), |r| r.respond(alice, payment, true, Some(2)))
        .unwrap();
    assert_eq!(room.version(), v + 2);
}

#[test]
fn outsider_cannot_act() {
    let (mut room, _, _) = scenario();
    assert!(matches!(
        room.generate(UserId::new(), &rb()),
        Err(NegotiationError::Forbidden(_))
    ));
}

const OPTIONS: [&[&str]; 3] = [
    &["exw", "fca", "ddp"],
    &["net-15", "net-30", "net-45", "net-60", "net-90"],
    &["unlimited", "three-x", "two-x", "one-x", "fees-paid"],
];

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

    #[test]
    fn agreement_never_regresses(
        actions in proptest::collection::vec((0u8..5, 0usize..3, 0usize..5, proptest::bool::ANY), 1..40)
    ) {
        let (mut room, alice, bob) = scenario();
        room.generate(alice, &rb()).unwrap();

        for (kind, clause, option, flag) in actions {
            let before: Vec<_> = room
                .clauses()
                .iter()
                .map(|c| c.agreed_option_id.clone())
                .collect();
            let version = room.version();
            let actor = if flag { alice } else { bob };
            let clause_id = room.clauses()[clause].id;
            let choices = OPTIONS[clause];
            let option_id = opt(choices[option % choices.len()]);

            let result = match kind {
                0 => room.transact(None, |r| r.respond(actor, clause_id, true, None).map(|_| ())),
                1 => room.transact(None, |r| r.respond(actor, clause_id, false, None).map(|_| ())),
                2 => room.transact(None, |r| {
                    r.counter_propose(
                        actor,
                        CounterProposalInput {
                            clause_id,
                            option_id,
                            rationale: None,
                            priority: None,
                            round_number: None,
                        },
                    )
                    .map(|_| ())
                }),
                3 => {
                    let pending = room
                        .counter_proposals()
                        .iter()
                        .find(|p| p.status == ProposalStatus::Pending)
                        .map(|p| p.id);
                    match pending {
                        Some(id) => room.transact(None, |r| {
                            r.respond_to_counter_proposal(alice, id, flag)
                                .or_else(|_| r.respond_to_counter_proposal(bob, id, flag))
                                .map(|_| ())
                        }),
                        None => Ok(()),
                    }
                }
                _ => room.transact(None, |r| r.regenerate(actor, &rb()).map(|_| ())),
            };

            match result {
                Ok(()) => proptest::prop_assert!(room.version() >= version),
                Err(_) => proptest::prop_assert_eq!(room.version(), version),
            }
            for (clause, was) in room.clauses().iter().zip(before) {
                if let Some(option) = was {
                    proptest::prop_assert_eq!(clause.status, ClauseStatus::Agreed);
                    proptest::prop_assert_eq!(clause.agreed_option_id.as_ref(), Some(&option));
                }
            }
        }
    }
}

use loyalty::domain::{luhn_valid, OrderNumber};
use loyalty::testkit::domain::with_check_digit;
use proptest::prelude::*;

proptest! {
    #[test]
    fn appended_check_digit_validates(payload in "[0-9]{1,18}") {
        let number = with_check_digit(&payload);
        prop_assert!(luhn_valid(&number));
        prop_assert!(OrderNumber::parse(number).is_ok());
    }

    #[test]
    fn changing_the_check_digit_invalidates(payload in "[0-9]{1,18}", bump in 1u32..10) {
        let number = with_check_digit(&payload);
        let last = number.chars().last().and_then(|c| c.to_digit(10)).unwrap();
        let wrong = format!("{payload}{}", (last + bump) % 10);
        prop_assert!(!luhn_valid(&wrong));
    }

    #[test]
    fn any_letter_rejects(payload in "[0-9]{1,10}", letter in "[a-zA-Z]", at in 0usize..10) {
        let mut number = with_check_digit(&payload);
        let at = at.min(number.len());
        number.insert_str(at, &letter);
        prop_assert!(!luhn_valid(&number));
    }

    #[test]
    fn blank_input_rejects(spaces in " {0,8}") {
        prop_assert!(!luhn_valid(&spaces));
    }
}

#[test]
fn known_numbers() {
    assert!(luhn_valid("49927398716"));
    assert!(luhn_valid("4561 2612 1234 5467"));
    assert!(!luhn_valid("49927398717"));
    assert!(!luhn_valid("1234-5678"));
}

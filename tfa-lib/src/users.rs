use crate::validation::check_control_whitespace;

pub const MAX_USERNAME_CHARS: usize = 128;

pub fn username_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    !given_ref.is_empty() && check_control_whitespace(given_ref, Some(MAX_USERNAME_CHARS))
}

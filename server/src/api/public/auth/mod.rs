pub mod login;
pub mod signup;

#[cfg(test)]
mod tests;

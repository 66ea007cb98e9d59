use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "ARGONBOX_PASSWORD";

/// Reads the password to hash or verify.
///
/// Sources, in order: `ARGONBOX_PASSWORD`, a piped stdin line, then an
/// interactive prompt. An empty password is accepted only from the environment
/// or a pipe, where it is explicit.
pub fn read_password() -> Result<Zeroizing<String>> {
    //  ARGONBOX_PASSWORD="supersecret" argonbox hash
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(pw));
    }

    //  printf "%s\n" "supersecret" | argonbox hash
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);
        return Ok(buf);
    }

    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if pw.is_empty() {
        bail!("No password provided");
    }
    Ok(pw)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}

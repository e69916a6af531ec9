use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const UNREACHABLE_SEND: &str = "http://127.0.0.1:1/v1/send";
const UNREACHABLE_BALANCE: &str = "http://127.0.0.1:1/balance";

#[test]
fn test_cli_end_to_end_dry_run() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.arg("--dry-run").arg("dispatch").arg("tests/fixtures/events.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "target,template,locale,status,executed,name,error",
        ))
        .stdout(predicate::str::contains("member:1,member_welcome,sw,sent,true,SMS-"))
        .stdout(predicate::str::contains("member:2,payment_reminder,en,sent,true,SMS-"))
        .stderr(predicate::str::contains(
            "Error dispatching event: Invalid input: target is required",
        ));

    Ok(())
}

#[test]
fn test_cli_unreachable_gateway_records_failures() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.args(["--send-url", UNREACHABLE_SEND, "--http-timeout-secs", "2"])
        .arg("dispatch")
        .arg("tests/fixtures/events.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("member:1,member_welcome,sw,failed,true,,"))
        .stdout(predicate::str::contains("member:2,payment_reminder,en,failed,true,,"))
        .stdout(predicate::str::contains("SMS service unavailable"));

    Ok(())
}

#[test]
fn test_cli_provider_billing_below_floor() -> Result<(), Box<dyn std::error::Error>> {
    let mut csv = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(
        &mut csv,
        b"target,id,name,phone,locale,template,billing,company,placeholders\n\
          member,1,Amina,0712345678,en,payment_reminder,provider,,firstName=Amina\n",
    )?;

    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.arg("--dry-run")
        .arg("dispatch")
        .arg(csv.path())
        .args(["--seed-credits", "99"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error dispatching event: Insufficient credits"))
        .stdout(predicate::str::contains("member:1").not());

    Ok(())
}

#[test]
fn test_cli_balance_dry_run() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.args(["--dry-run", "--dry-run-balance", "321", "balance"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("provider,remaining,used"))
        .stdout(predicate::str::contains("beem_africa,321,0"));

    Ok(())
}

#[test]
fn test_cli_balance_unreachable_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.args(["--balance-url", UNREACHABLE_BALANCE, "--http-timeout-secs", "2", "balance"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to check SMS balance"));

    Ok(())
}

#[test]
fn test_cli_refill_issues_voucher() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("gymsms"));
    cmd.args([
        "refill",
        "--company-id",
        "7",
        "--company-name",
        "Iron Gym",
        "--expires-at",
        "2030-01-01T00:00:00Z",
        "--package",
        "Starter",
        "--units",
        "100",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("company,package,granted,remaining,expires_at"))
        .stdout(predicate::str::contains("7,Starter,100,100,2030-01-01T00:00:00+00:00"));

    Ok(())
}

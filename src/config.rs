use std::{env, net::{SocketAddr, ToSocketAddrs as _}};

use sea_orm::ConnectOptions;
use tracing::info;

use crate::domain::{AdvanceCap, PayrollPolicy, Policies};

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub admin_pin: String,

    pub policies: Policies,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        admin_pin: load_admin_pin(),
        policies: Policies {
            payroll: load_payroll_policy(),
            advance_cap: load_advance_cap(),
        },
    }
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");

    env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set")
}

fn load_admin_pin() -> String {
    info!("Loading environment `ADMIN_PIN`");

    let var = env::var("ADMIN_PIN").expect("Environment `ADMIN_PIN` is required to be set");
    assert!(!var.trim().is_empty(), "`ADMIN_PIN` must not be empty");

    var.trim().to_owned()
}

fn load_payroll_policy() -> PayrollPolicy {
    info!("Loading environment `PAYROLL_POLICY`");

    env::var("PAYROLL_POLICY")
        .map(|var| var.parse().expect("`PAYROLL_POLICY` must be `fixed` or `proportional`"))
        .unwrap_or_default()
}

fn load_advance_cap() -> AdvanceCap {
    info!("Loading environment `ADVANCE_CAP`");

    env::var("ADVANCE_CAP")
        .map(|var| var.parse().expect("`ADVANCE_CAP` must be `salary` or `none`"))
        .unwrap_or_default()
}

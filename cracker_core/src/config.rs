/*!
 * Validated configuration for the two binaries.
 *
 * Argument *parsing* is deliberately minimal — positional fields read by
 * hand, no flags, no help text. What's specified here is the validation:
 * turning raw strings into the numbers the FSM actions need, or a single
 * `CrackerError::Argument` naming what was wrong.
 */
use crate::cracker_error;
use crate::error::CrackerError;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_addr: String,
    pub coordinator_port: u16,
    pub threads: usize,
}

impl WorkerConfig {
    /// Expects exactly `<addr> <port> <threads>`.
    pub fn parse(args: &[String]) -> Result<Self, CrackerError> {
        let [addr, port, threads] = take_three(args, "addr port threads")?;

        let coordinator_port: u16 = port
            .parse()
            .map_err(|_| cracker_error!(Argument, "port {port:?} is not a valid u16"))?;

        let threads: usize = threads
            .parse()
            .map_err(|_| cracker_error!(Argument, "threads {threads:?} is not a valid integer"))?;
        if threads == 0 {
            return Err(cracker_error!(Argument, "threads must be at least 1"));
        }

        Ok(WorkerConfig { coordinator_addr: addr.clone(), coordinator_port, threads })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub bind_port: u16,
    pub target_hash: String,
    pub keyspace_size: u64,
    pub work_size: u64,
    pub checkpoint_interval: u64,
    pub timeout_seconds: u32,
}

impl ServerConfig {
    /// Expects exactly
    /// `<bind_addr> <bind_port> <target_hash> <keyspace_size> <work_size> <checkpoint_interval> <timeout_seconds>`.
    pub fn parse(args: &[String]) -> Result<Self, CrackerError> {
        if args.len() != 7 {
            return Err(cracker_error!(
                Argument,
                "expected 7 arguments (bind_addr bind_port target_hash keyspace_size work_size checkpoint_interval timeout_seconds), got {}",
                args.len()
            ));
        }

        let bind_addr = args[0].clone();
        let bind_port: u16 = args[1]
            .parse()
            .map_err(|_| cracker_error!(Argument, "bind_port {:?} is not a valid u16", args[1]))?;
        let target_hash = args[2].clone();
        if target_hash.is_empty() {
            return Err(cracker_error!(Argument, "target_hash must not be empty"));
        }
        let keyspace_size: u64 = args[3]
            .parse()
            .map_err(|_| cracker_error!(Argument, "keyspace_size {:?} is not a valid u64", args[3]))?;
        let work_size: u64 = args[4]
            .parse()
            .map_err(|_| cracker_error!(Argument, "work_size {:?} is not a valid u64", args[4]))?;
        if work_size == 0 {
            return Err(cracker_error!(Argument, "work_size must be at least 1"));
        }
        let checkpoint_interval: u64 = args[5]
            .parse()
            .map_err(|_| cracker_error!(Argument, "checkpoint_interval {:?} is not a valid u64", args[5]))?;
        if checkpoint_interval == 0 {
            return Err(cracker_error!(Argument, "checkpoint_interval must be at least 1"));
        }
        let timeout_seconds: u32 = args[6]
            .parse()
            .map_err(|_| cracker_error!(Argument, "timeout_seconds {:?} is not a valid u32", args[6]))?;
        if timeout_seconds == 0 {
            return Err(cracker_error!(Argument, "timeout_seconds must be at least 1"));
        }

        Ok(ServerConfig {
            bind_addr,
            bind_port,
            target_hash,
            keyspace_size,
            work_size,
            checkpoint_interval,
            timeout_seconds,
        })
    }
}

fn take_three<'a>(args: &'a [String], expected: &str) -> Result<[&'a String; 3], CrackerError> {
    if args.len() != 3 {
        return Err(cracker_error!(
            Argument,
            "expected 3 arguments ({expected}), got {}",
            args.len()
        ));
    }
    Ok([&args[0], &args[1], &args[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn worker_config_parses_valid_args() {
        let cfg = WorkerConfig::parse(&v(&["127.0.0.1", "9000", "4"])).unwrap();
        assert_eq!(cfg.coordinator_addr, "127.0.0.1");
        assert_eq!(cfg.coordinator_port, 9000);
        assert_eq!(cfg.threads, 4);
    }

    #[test]
    fn worker_config_rejects_zero_threads() {
        assert!(WorkerConfig::parse(&v(&["127.0.0.1", "9000", "0"])).is_err());
    }

    #[test]
    fn worker_config_rejects_wrong_arity() {
        assert!(WorkerConfig::parse(&v(&["127.0.0.1", "9000"])).is_err());
    }

    #[test]
    fn server_config_parses_valid_args() {
        let cfg = ServerConfig::parse(&v(&[
            "0.0.0.0", "9000", "hunter2", "1000000", "1000", "100", "30",
        ]))
        .unwrap();
        assert_eq!(cfg.keyspace_size, 1_000_000);
        assert_eq!(cfg.work_size, 1000);
        assert_eq!(cfg.timeout_seconds, 30);
    }

    #[test]
    fn server_config_rejects_empty_hash() {
        assert!(ServerConfig::parse(&v(&[
            "0.0.0.0", "9000", "", "1000000", "1000", "100", "30",
        ]))
        .is_err());
    }

    #[test]
    fn server_config_allows_zero_keyspace() {
        let cfg = ServerConfig::parse(&v(&[
            "0.0.0.0", "9000", "hunter2", "0", "1000", "100", "30",
        ]))
        .unwrap();
        assert_eq!(cfg.keyspace_size, 0);
    }
}

pub mod sge {
    pub const RUNNING_STATES: &[&str] = &["r", "d", "e"];
    pub const QUEUED_STATES: &[&str] = &["qw", "q", "w", "s", "h", "t"];

    pub const QCONF: &str = "qconf";
    pub const QSTAT: &str = "qstat";
    pub const QSUB: &str = "qsub";

    pub const STDOUT_SUFFIX: &str = ".o";
    pub const STDERR_SUFFIX: &str = ".e";
}

pub mod http {
    pub const DEFAULT_TOKEN_HEADER: &str = "Girder-Token";
    pub const STATUS_PARAM: &str = "status";
    pub const SCHEDULER_JOB_ID_PARAM: &str = "sgeJobId";
}

pub mod files {
    pub const CONFIG_PREFIX: &str = "nimbus-config-";
    pub const SCRIPT_PREFIX: &str = "nimbus-job-";
    pub const JOB_DIR_TIMESTAMP: &str = "%Y-%m-%d-%H-%M-%S";
}

pub mod inventory {
    pub const CONTROL_GROUP: &str = "master";
    pub const USER_VARS: &[&str] = &["ansible_user", "ansible_ssh_user"];
}

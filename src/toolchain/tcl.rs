//! Tcl script builders for the Vivado batch interface
//!
//! Each flow step is a self-contained script: open the project, run the
//! step, close. Scripts are fed to `vivado -mode batch -source -` over
//! stdin, so no temporary files are involved.

/// Brace-quote a value for safe interpolation into a Tcl script
pub fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}");
    format!("{{{escaped}}}")
}

pub fn create_project(name: &str, dir: &str, part: &str, board: Option<&str>) -> String {
    let mut script = format!(
        "create_project {} {} -part {} -force\n",
        quote(name),
        quote(dir),
        quote(part)
    );
    if let Some(board) = board {
        script.push_str(&format!("set_property board_part {} [current_project]\n", quote(board)));
    }
    script.push_str("close_project\n");
    script
}

pub fn open_project(project: &str) -> String {
    format!(
        "open_project {}\nputs \"Project opened: [current_project]\"\nclose_project\n",
        quote(project)
    )
}

pub fn add_source(project: &str, file: &str, file_type: Option<&str>) -> String {
    let add = match file_type.map(str::to_ascii_lowercase).as_deref() {
        Some("xdc") => format!("add_files -fileset constrs_1 {}", quote(file)),
        Some("ip") => format!("import_ip {}", quote(file)),
        _ if file.ends_with(".xdc") => format!("add_files -fileset constrs_1 {}", quote(file)),
        _ if file.ends_with(".xci") => format!("import_ip {}", quote(file)),
        _ => format!("add_files {}", quote(file)),
    };
    format!("open_project {}\n{}\nclose_project\n", quote(project), add)
}

pub fn run_synthesis(project: &str, jobs: u64) -> String {
    format!(
        "open_project {}\nreset_run synth_1\nlaunch_runs synth_1 -jobs {jobs}\nwait_on_run synth_1\nclose_project\n",
        quote(project)
    )
}

pub fn run_implementation(project: &str, jobs: u64) -> String {
    format!(
        "open_project {}\nlaunch_runs impl_1 -jobs {jobs}\nwait_on_run impl_1\nclose_project\n",
        quote(project)
    )
}

pub fn generate_bitstream(project: &str, jobs: u64, compress: bool) -> String {
    let mut script = format!("open_project {}\n", quote(project));
    if compress {
        script.push_str("open_run impl_1\nset_property BITSTREAM.GENERAL.COMPRESS TRUE [current_design]\n");
    }
    script.push_str(&format!(
        "launch_runs impl_1 -to_step write_bitstream -jobs {jobs}\nwait_on_run impl_1\nclose_project\n"
    ));
    script
}

pub fn program_device(bitstream: &str) -> String {
    format!(
        "open_hw_manager\n\
         connect_hw_server -allow_non_jtag\n\
         open_hw_target\n\
         current_hw_device [lindex [get_hw_devices] 0]\n\
         set_property PROGRAM.FILE {} [current_hw_device]\n\
         program_hw_devices [current_hw_device]\n\
         close_hw_manager\n",
        quote(bitstream)
    )
}

pub fn run_simulation(project: &str, testbench: &str, sim_time: &str) -> String {
    format!(
        "open_project {}\n\
         set_property top {} [get_filesets sim_1]\n\
         launch_simulation\n\
         run {}\n\
         close_sim\n\
         close_project\n",
        quote(project),
        quote(testbench),
        sim_time
    )
}

/// Report commands print to stdout; the caller gets the full text
pub fn fetch_report(project: &str, report_command: &str) -> String {
    format!(
        "open_project {}\nopen_run impl_1\n{report_command}\nclose_project\n",
        quote(project)
    )
}

pub fn run_status(project: &str, run_name: &str) -> String {
    format!(
        "open_project {}\n\
         set status [get_property STATUS [get_runs {}]]\n\
         puts \"STATUS: $status\"\n\
         close_project\n",
        quote(project),
        quote(run_name)
    )
}

use clap::Parser;

/// This is a program that compiles the averaged results of a scoring contest.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The session configuration file, in JSON format. It lists the
    /// score sheets to read and where to write the outputs. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, judgetally will
    /// check that the compiled summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the session will be written in
    /// JSON format to the given location. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The file containing the score sheets. Setting this option overrides
    /// the sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: json, csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use (default: the first one).
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (directory) Where to write the averaged report of each candidate.
    #[clap(long, value_parser)]
    pub report_dir: Option<String>,

    /// (file path) Where to write the CSV export of all the score sheets.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (file path) The reviewer corrections, in JSON format. Missing fields are initialized
    /// from the score sheets and the file is written back.
    #[clap(long, value_parser)]
    pub overrides: Option<String>,

    /// A correction for one candidate, in the form ID.field=value, for example
    /// 01-03.name=Alice. The fields are name, enName, organization and feedback.
    #[clap(long, value_parser)]
    pub edit: Vec<String>,

    /// Shares the current score sheets: stores them in the sync directory and prints a token.
    #[clap(long, takes_value = false)]
    pub create_session: bool,

    /// Replaces the current score sheets with the ones shared under this token.
    #[clap(long, value_parser)]
    pub join_session: Option<String>,

    /// (directory, default .judgetally-sync) Where the shared sessions are stored.
    #[clap(long, value_parser)]
    pub sync_dir: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

use clap::Parser;
use std::path::PathBuf;

const AFTER_HELP: &str = r#"Examples:
  # Find f calls with a single variable argument.
  phpgrep file.php 'f(${"var"})'

  # Search a directory recursively, restricting the variable
  # names to $id, $uid and $gid.
  phpgrep -v ~/code/php 'f(${"x:var"})' 'x=$id,$uid,$gid'

  # Run phpgrep on two folders (recursively).
  phpgrep dir1,dir2 '"some string"'

  # Print only matches, without locations.
  phpgrep --format '{{.Match}}' file.php 'pattern'

  # Print only assignment right-hand sides.
  phpgrep --format '{{.rhs}}' file.php '$_ = $rhs'

  # Ignore vendored source code inside a project.
  phpgrep --exclude '/vendor/' project/ 'pattern'

Format template fields:
  {{.Filename}}  match containing file name
  {{.Line}}      line number where the match started
  {{.MatchLine}} a source code line that contains the match
  {{.Match}}     an entire match string
  {{.x}}         $x submatch string (any submatch name)

The output colors can be configured with the --color-<name> flags.
Use --no-color to disable the output coloring.

Exit status:
  0 if something is matched
  1 if nothing is matched
  2 if an error occurred
"#;

/// Structural search and replace for PHP code.
#[derive(Parser, Debug, Clone)]
#[command(name = "phpgrep", version, after_help = AFTER_HELP)]
pub struct Opts {
    /// Comma-separated list of files or directories to search in
    pub targets: String,
    /// Pattern that describes what is being matched
    pub pattern: String,
    /// Optional filters bound to the pattern's meta-variables
    pub filters: Vec<String>,

    /// Replace matches with the --format result in place
    #[arg(short = 'i', long = "in-place")]
    pub replace: bool,
    /// Verbose mode: turn on additional debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Multiline mode: print matches without escaping newlines to \n
    #[arg(short = 'm', long = "multiline")]
    pub multiline: bool,
    /// Print absolute file names in the output
    #[arg(long)]
    pub abs: bool,
    /// Strict case matching, so F() and f() are considered distinct
    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,
    /// Disable syntax normalizations, so 'array()' and '[]' are not
    /// considered identical, and so on
    #[arg(long = "strict-syntax")]
    pub strict_syntax: bool,
    /// Disable the colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
    /// Stop after this many match results, 0 for the built-in cap
    #[arg(long, default_value_t = 1000)]
    pub limit: u64,
    /// Number of concurrent workers (defaults to the CPU count)
    #[arg(long)]
    pub workers: Option<usize>,
    /// Exclude files and directories by regexp pattern
    #[arg(long)]
    pub exclude: Option<String>,
    /// Exclude the results listed in the given file
    #[arg(long = "exclude-results")]
    pub exclude_results: Option<PathBuf>,
    /// Comma-separated list of extensions to scan
    #[arg(long = "php-ext", default_value = "php,php5,inc,phtml")]
    pub php_ext: String,
    /// Output template
    #[arg(long, default_value = "{{.Filename}}:{{.Line}}: {{.MatchLine}}")]
    pub format: String,
    /// Progress printing mode: "update", "append" or "none"
    #[arg(long, default_value = "update")]
    pub progress: String,
    /// {{.Filename}} text color
    #[arg(
        long = "color-filename",
        env = "PHPGREP_COLOR_FILENAME",
        default_value = "dark-magenta"
    )]
    pub color_filename: String,
    /// {{.Line}} text color
    #[arg(
        long = "color-line",
        env = "PHPGREP_COLOR_LINE",
        default_value = "dark-green"
    )]
    pub color_line: String,
    /// {{.Match}} text color
    #[arg(
        long = "color-match",
        env = "PHPGREP_COLOR_MATCH",
        default_value = "dark-red"
    )]
    pub color_match: String,
}

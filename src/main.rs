use std::path::Path;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use fiql_search::{FiqlParser, ParserConfig, SearchBean, SearchBeanResolver, SqlCompiler, SqlPrinterVisitor};

const CONFIG_FILE: &str = "fiql.json";
const LOG_ENV: &str = "FIQL_LOG";
const DEFAULT_TABLE: &str = "items";

const HELP: &str = "\
输入 FIQL 表达式, 例如 name==foo*;age=ge=18
  :table <name>  设置 SQL 表名
  :help          显示帮助
  :quit          退出";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// 加载解析配置，配置文件不存在或无效时使用默认配置
fn load_config() -> ParserConfig {
    if !Path::new(CONFIG_FILE).exists() {
        return ParserConfig::default();
    }
    match ParserConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载: {CONFIG_FILE}");
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({e}), 使用默认配置");
            ParserConfig::default()
        }
    }
}

struct Repl {
    parser: FiqlParser<SearchBean>,
    compiler: SqlCompiler,
    table: String,
}

impl Repl {
    fn run(&self, expression: &str) {
        let tree = match self.parser.parse(expression) {
            Ok(tree) => tree,
            Err(e) => {
                println!("✗ 解析失败: {e}");
                return;
            }
        };
        println!("条件树: {tree:#?}");

        match SqlPrinterVisitor::new(Some(&self.table), &[]).render(&tree) {
            Ok(sql) => println!("SQL: {sql}"),
            Err(e) => println!("✗ SQL 渲染失败: {e}"),
        }
        match self.compiler.compile(&tree, &self.table, &[]) {
            Ok(result) => {
                println!("参数化 SQL: {}", result.sql);
                println!("绑定参数: {:?}", result.values.0);
            }
            Err(e) => println!("✗ SQL 编译失败: {e}"),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let parser =
        FiqlParser::with_config(SearchBeanResolver, load_config()).context("invalid parser configuration")?;
    let mut repl = Repl { parser, compiler: SqlCompiler::new(), table: DEFAULT_TABLE.to_string() };

    // 命令行参数: 处理单个表达式后退出
    if let Some(expression) = std::env::args().nth(1) {
        repl.run(&expression);
        return Ok(());
    }

    println!("--- FIQL Search: 表达式到 SQL ---");
    println!("{HELP}");

    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    loop {
        match editor.readline("fiql> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str())?;

                match line.trim() {
                    ":quit" | ":q" => break,
                    ":help" => println!("{HELP}"),
                    command if command.starts_with(":table") => {
                        let table = command.trim_start_matches(":table").trim();
                        if table.is_empty() {
                            println!("当前表名: {}", repl.table);
                        } else {
                            repl.table = table.to_string();
                            println!("✅ 表名设置为: {}", repl.table);
                        }
                    }
                    // 表达式本身不做裁剪
                    _ => repl.run(&line),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }
    Ok(())
}

//! Transcendental constants at the session's working precision.
//!
//! The values come from decimal literals of 3011 significant digits, which is
//! just about what a 10000-bit float can hold. Every call parses them again at
//! the requested precision and hands back freshly allocated floats.

use std::io::Write;

use rug::Float;
use tracing::{trace, warn};

use crate::calc_types::{assert_internal, CalcError};

/// Bits of precision carried by the literals below.
pub const CONST_PRECISION_BITS: u32 = 10000;
/// 10000*log(2)/log(10)
pub const CONST_PRECISION_DIGITS: u32 = 3011;

const LITERAL_E: &str = "\
    2.7182818284590452353602874713526624977572470936999595749669676277240766303535475945713821785251\
    664274274663919320030599218174135966290435729003342952605956307381323286279434907632338298807531\
    952510190115738341879307021540891499348841675092447614606680822648001684774118537423454424371075\
    390777449920695517027618386062613313845830007520449338265602976067371132007093287091274437470472\
    306969772093101416928368190255151086574637721112523897844250569536967707854499699679468644549059\
    879316368892300987931277361782154249992295763514822082698951936680331825288693984964651058209392\
    398294887933203625094431173012381970684161403970198376793206832823764648042953118023287825098194\
    558153017567173613320698112509961818815930416903515988885193458072738667385894228792284998920868\
    058257492796104841984443634632449684875602336248270419786232090021609902353043699418491463140934\
    317381436405462531520961836908887070167683964243781405927145635490613031072085103837505101157477\
    041718986106873969655212671546889570350354021234078498193343210681701210056278802351930332247450\
    158539047304199577770935036604169973297250886876966403555707162268447162560798826517871341951246\
    652010305921236677194325278675398558944896970964097545918569563802363701621120477427228364896134\
    225164450781824423529486363721417402388934412479635743702637552944483379980161254922785092577825\
    620926226483262779333865664816277251640191059004916449982893150566047258027786318641551956532442\
    586982946959308019152987211725563475463964479101459040905862984967912874068705048958586717479854\
    667757573205681288459205413340539220001137863009455606881667400169842055804033637953764520304024\
    322566135278369511778838638744396625322498506549958862342818997077332761717839280349465014345588\
    970719425863987727547109629537415211151368350627526023264847287039207643100595841166120545297030\
    236472549296669381151373227536450988890313602057248176585118063036442812314965507047510254465011\
    727211555194866850800368532281831521960037356252794495158284188294787610852639813955990067376482\
    922443752871846245780361929819713991475644882626039033814418232625150974827987779964373089970388\
    867782271383605772978824125611907176639465070633045279546618550966661856647097113444740160704626\
    215680717481877844371436988218559670959102596862002353718588748569652200050311734392073211390803\
    293634479727355955277349071783793421637012050054513263835440001863239914907054797780566978533580\
    489669062951194324730995876552368128590413832411607226029983305353708761389396391779574540161372\
    236187893652605381558415871869255386061647798340254351284396129460352913325942794904337299085731\
    580290958631382683291477116396337092400316894586360606458459251269946557248391865642097526850823\
    075442545993769170419777800853627309417101634349076964237222943523661255725088147792231519747780\
    605696725380171807763603462459278778465850656050780844211529697521890874019660906651803516501792\
    504619501366585436632712549639908549144200014574760819302212066024330096412704894390397177195180\
    699086998606636583232278709376502260";

const LITERAL_PI: &str = "\
    3.1415926535897932384626433832795028841971693993751058209749445923078164062862089986280348253421\
    170679821480865132823066470938446095505822317253594081284811174502841027019385211055596446229489\
    549303819644288109756659334461284756482337867831652712019091456485669234603486104543266482133936\
    072602491412737245870066063155881748815209209628292540917153643678925903600113305305488204665213\
    841469519415116094330572703657595919530921861173819326117931051185480744623799627495673518857527\
    248912279381830119491298336733624406566430860213949463952247371907021798609437027705392171762931\
    767523846748184676694051320005681271452635608277857713427577896091736371787214684409012249534301\
    465495853710507922796892589235420199561121290219608640344181598136297747713099605187072113499999\
    983729780499510597317328160963185950244594553469083026425223082533446850352619311881710100031378\
    387528865875332083814206171776691473035982534904287554687311595628638823537875937519577818577805\
    321712268066130019278766111959092164201989380952572010654858632788659361533818279682303019520353\
    018529689957736225994138912497217752834791315155748572424541506959508295331168617278558890750983\
    817546374649393192550604009277016711390098488240128583616035637076601047101819429555961989467678\
    374494482553797747268471040475346462080466842590694912933136770289891521047521620569660240580381\
    501935112533824300355876402474964732639141992726042699227967823547816360093417216412199245863150\
    302861829745557067498385054945885869269956909272107975093029553211653449872027559602364806654991\
    198818347977535663698074265425278625518184175746728909777727938000816470600161452491921732172147\
    723501414419735685481613611573525521334757418494684385233239073941433345477624168625189835694855\
    620992192221842725502542568876717904946016534668049886272327917860857843838279679766814541009538\
    837863609506800642251252051173929848960841284886269456042419652850222106611863067442786220391949\
    450471237137869609563643719172874677646575739624138908658326459958133904780275900994657640789512\
    694683983525957098258226205224894077267194782684826014769909026401363944374553050682034962524517\
    493996514314298091906592509372216964615157098583874105978859597729754989301617539284681382686838\
    689427741559918559252459539594310499725246808459872736446958486538367362226260991246080512438843\
    904512441365497627807977156914359977001296160894416948685558484063534220722258284886481584560285\
    060168427394522674676788952521385225499546667278239864565961163548862305774564980355936345681743\
    241125150760694794510965960940252288797108931456691368672287489405601015033086179286809208747609\
    178249385890097149096759852613655497818931297848216829989487226588048575640142704775551323796414\
    515237462343645428584447952658678210511413547357395231134271661021359695362314429524849371871101\
    457654035902799344037420073105785390621983874478084784896833214457138687519435064302184531910484\
    810053706146806749192781911979399520614196634287544406437451237181921799983910159195618146751426\
    912397489409071864942319615679452080";

const LITERAL_LOG2: &str = "\
    0.6931471805599453094172321214581765680755001343602552541206800094933936219696947156058633269964\
    186875420014810205706857336855202357581305570326707516350759619307275708283714351903070386238916\
    734711233501153644979552391204751726815749320651555247341395258829504530070953263666426541042391\
    578149520437404303855008019441706416715186447128399681717845469570262716310645461502572074024816\
    377733896385506952606683411372738737229289564935470257626520988596932019650585547647033067936544\
    325476327449512504060694381471046899465062201677204245245296126879465461931651746813926725041038\
    025462596568691441928716082938031727143677826548775664850856740776484514644399404614226031930967\
    354025744460703080960850474866385231381816767514386674766478908814371419854942315199735488037516\
    586127535291661000710535582498794147295092931138971559982056543928717000721808576102523688921324\
    497138932037843935308877482597017155910708823683627589842589185353024363421436706118923678919237\
    231467232172053401649256872747782344535347648114941864238677677440606956265737960086707625719918\
    473402265146283790488306203306114463007371948900274364396500258093651944304119115060809487930678\
    651588709006052034684297361938412896525565396860221941229242075743217574890977067526871158170511\
    370091589426654785959648906530584602586683829400228330053820740056770530467870018416240441883323\
    279838634900156312188956065055315127219939833203075140842609147900126516824344389357247278820548\
    627155274187724300248979454019618723398086083166481149093066751933931289043164137068139777649817\
    697486890388778999129650361927071088926410523092478391737350122984242049956893599220660220465494\
    151061391878857442455775102068370308666194808964121868077902081815885800016881159730561866761991\
    873952007667192145922367206025395954365416553112951759899400560003665135675690512459268257439464\
    831683326249018038242408242314523061409638057007025513877026817851630690255137032340538021450190\
    153740295099422629957796474271381573638017298739407042421799722669629799393127069357472404933865\
    308797587216996451294464918837711567016785988049818388967841349383140140731664727653276359192335\
    112333893387095132090592721854713289754707978913844454666761927028855334234298993218037691549733\
    402675467588732367783429161918104301160916952655478597328917635455567428638774639871019124317542\
    558883012067792102803412068797591430812833072303008834947057924965910058600123415617574132724659\
    430684354652111350215443415399553818565227502214245664400062761833032064727257219751529082785684\
    213207959886389672771195522188190466039570097747065126195052789322960889314056254334425523920620\
    303439417773579455921259019925591148440242390125542590031295370519220615064345837878730020354144\
    217857580132364516607099143831450049858966885772221486528821694181270488607589722032166631283783\
    291567630749872985746389282693735098407780493950049339987626475507031622161390348452994249172483\
    734061366226383493681116841670569252147513839306384553718626877973288955588716344297562447553923\
    663694888778238901749810273565524050";

const LITERAL_LOG10: &str = "\
    2.3025850929940456840179914546843642076011014886287729760333279009675726096773524802359972050895\
    982983419677840422862486334095254650828067566662873690987816894829072083255546808437998948262331\
    985283935053089653777326288461633662222876982198867465436674744042432743651550489343149393914796\
    194044002221051017141748003688084012647080685567743216228355220114804663715659121373450747856947\
    683463616792101806445070648000277502684916746550586856935673420670581136429224554405758925724208\
    241314695689016758940256776311356919292033376587141660230105703089634572075440370847469940168269\
    282808481184289314848524948644871927809676271275775397027668605952496716674183485704422507197965\
    004714951050492214776567636938662976979522110718264549734772662425709429322582798502585509785265\
    383207606726317164309505995087807523710333101197857547331541421808427543863591778117054309827482\
    385045648019095610299291824318237525357709750539565187697510374970888692180205189339507238539205\
    144634197265287286965110862571492198849978748873771345686209167058498078280597511938544450099781\
    311469159346662410718466923101075984383191912922307925037472986509290098803919417026544168163357\
    275557031515961135648465461908970428197633658369837163289821744073660091621778505417792763677311\
    450417821376601110107310423978325218948988175979217986663943195239368559164471182467532456309125\
    287783309636042629821530408745609277607266413547875766162629265682987049579549139549180492090694\
    385807900327630179415031178668620924085379498612649334793548717374516758095370882810674524401058\
    924449764796860751202757241818749893959716431055188481952883307466993178146349300003212003277656\
    541304726218839705967944579434683432183953044148448037013057536742621536755798147704580314136377\
    932362915601281853364984669422614652064599420729171193706024449293580370077189810973625332245483\
    669885055282859661928050984471751985036666808749704969822732202448233430971691111368135884186965\
    493237149969419796878030088504089796185987565798948364452120436982164152929878117429733325886079\
    159125109671875109292484750239305726654462762009230687915181358034777012955936462984123664970233\
    551745861955647724618577173693684046765770478743197805738532718109338834963388130699455693993461\
    010907456160333122479493604553618491233330637047517248712763791409243983318101647378233796922656\
    376820717069358463945316169494117018419381194054164494661112747128197058177832938417422314099300\
    229115023621921867233372683856882735333719251034129307056325444266114297653883018223840910261985\
    828884335874559604530045483707890525784731662837019533922310475275649981192287427897137157132283\
    196410034221242100821806795252766898581809561192083917607210809199234615169525990994737827806481\
    280587927319938934534153201859697110214075422827962982370689417647406422257572124553925261793736\
    524344405605953365915391603125244801493132345724538795243890368392364505078817313597112381453237\
    015084134911223243909276817247496079557991513639828810582857405380006533716555530141963322419180\
    876210182049194926514838926922937079";

/// One set of constants, all rounded to the same precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Constants {
    pub prec: u32,
    pub e: Float,
    pub pi: Float,
    pub pi_by_2: Float,
    pub minus_pi_by_2: Float,
    pub log2: Float,
    pub log10: Float,
    pub zero: Float,
    pub one: Float,
    pub two: Float,
    pub half: Float,
    pub minus_one: Float,
}

impl Constants {
    /// Looks up a constant by the name it has in expressions.
    pub fn by_name(&self, name: &str) -> Option<Float> {
        match name {
            "e" => Some(self.e.clone()),
            "pi" => Some(self.pi.clone()),
            _ => None,
        }
    }
}

fn parse_literal(prec: u32, name: &str, literal: &str) -> Result<Float, CalcError> {
    let parsed = Float::parse(literal).map_err(|e| CalcError::Internal {
        message: format!("setting {}: {}", name, e),
    })?;
    let value = Float::with_val(prec, parsed);
    assert_internal(value.is_normal() && value.is_sign_positive(), &format!("setting {}", name))?;
    Ok(value)
}

/// Builds the constant set at `prec` bits.
///
/// Asking for more than [`CONST_PRECISION_BITS`] writes a warning to `err` and
/// carries on; the extra bits are then only as good as the literals.
/// A literal that fails to parse is a defect and comes back as
/// [`CalcError::Internal`].
pub fn consts(prec: u32, err: &mut dyn Write) -> Result<Constants, CalcError> {
    if prec > CONST_PRECISION_BITS {
        warn!(prec, "precision exceeds compiled constants");
        writeln!(
            err,
            "warning: precision too high; only have {} digits ({} bits) of precision for e and pi",
            CONST_PRECISION_DIGITS, CONST_PRECISION_BITS
        )
        .map_err(|e| CalcError::Internal {
            message: format!("writing warning: {}", e),
        })?;
    }
    trace!(prec, "materializing constants");

    let pi = parse_literal(prec, "pi", LITERAL_PI)?;
    let mut pi_by_2 = Float::with_val(prec, &pi);
    pi_by_2 /= 2u32;
    let minus_pi_by_2 = Float::with_val(prec, -&pi_by_2);

    Ok(Constants {
        prec,
        e: parse_literal(prec, "e", LITERAL_E)?,
        pi,
        pi_by_2,
        minus_pi_by_2,
        log2: parse_literal(prec, "log(2)", LITERAL_LOG2)?,
        log10: parse_literal(prec, "log(10)", LITERAL_LOG10)?,
        zero: Float::with_val(prec, 0),
        one: Float::with_val(prec, 1),
        two: Float::with_val(prec, 2),
        half: Float::with_val(prec, 0.5),
        minus_one: Float::with_val(prec, -1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use rug::float::Constant;

    #[rstest]
    #[case(1)]
    #[case(53)]
    #[case(256)]
    #[case(1000)]
    #[case(5000)]
    fn test_pi_and_e_match_at_precision(#[case] prec: u32) {
        let mut err = Vec::new();
        let c = consts(prec, &mut err).unwrap();
        assert_eq!(c.pi, Float::with_val(prec, Constant::Pi));
        assert_eq!(c.e, Float::with_val(prec, 1).exp());
        assert_eq!(c.log2, Float::with_val(prec, Constant::Log2));
        assert_eq!(c.pi.prec(), prec);
        assert!(err.is_empty());
    }

    #[test]
    fn test_half_pi_is_exact() {
        let mut err = Vec::new();
        let c = consts(300, &mut err).unwrap();
        let mut doubled = c.pi_by_2.clone();
        doubled *= 2u32;
        assert_eq!(doubled, c.pi);
        assert_eq!(c.minus_pi_by_2, -c.pi_by_2.clone());
        assert_eq!(c.log10, Float::with_val(300, 10).ln());
    }

    #[test]
    fn test_small_values() {
        let mut err = Vec::new();
        let c = consts(64, &mut err).unwrap();
        assert_eq!(c.zero, 0);
        assert_eq!(c.one, 1);
        assert_eq!(c.two, 2);
        assert_eq!(c.half, 0.5);
        assert_eq!(c.minus_one, -1);
    }

    #[test]
    fn test_warns_above_literal_precision() {
        let mut err = Vec::new();
        let c = consts(CONST_PRECISION_BITS + 1, &mut err).unwrap();
        let text = String::from_utf8(err).unwrap();
        assert!(
            text.starts_with("warning: precision too high; only have 3011 digits (10000 bits)")
        );
        assert_eq!(c.pi.prec(), CONST_PRECISION_BITS + 1);
        assert!(c.pi.to_string_radix(10, Some(3000)).starts_with(&LITERAL_PI[..2999]));
        assert!(c.e.to_string_radix(10, Some(3000)).starts_with(&LITERAL_E[..2999]));
    }

    #[test]
    fn test_no_warning_at_limit() {
        let mut err = Vec::new();
        consts(CONST_PRECISION_BITS, &mut err).unwrap();
        assert!(err.is_empty());
    }

    #[test]
    fn test_fresh_values_per_call() {
        let mut err = Vec::new();
        let mut a = consts(128, &mut err).unwrap();
        let b = consts(128, &mut err).unwrap();
        a.pi += 1u32;
        assert_eq!(b.pi, Float::with_val(128, Constant::Pi));
        assert_eq!(a.by_name("pi").unwrap(), Float::with_val(128, &b.pi + 1u32));
        assert!(a.by_name("tau").is_none());
    }

    #[test]
    fn test_literals_have_full_length() {
        for lit in [LITERAL_E, LITERAL_PI, LITERAL_LOG2, LITERAL_LOG10] {
            assert_eq!(lit.len(), CONST_PRECISION_DIGITS as usize + 1);
        }
    }
}
